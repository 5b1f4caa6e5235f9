//! Identifier mangling shared by the listing and weight emitters.

use std::collections::BTreeMap;

use evalgen_core::NodeId;

/// Mangle a model node name into a C++-safe identifier.
///
/// Non-alphanumeric characters become underscores; a leading digit gets an
/// underscore prefix. Distinct model names can collide after mangling;
/// [`unique_idents`] disambiguates with the node id.
pub fn sanitize_ident(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Assign a unique mangled identifier to each (id, name) pair, in id order.
/// On collision the node id is appended, keeping the result deterministic.
pub fn unique_idents<'a, I>(items: I) -> BTreeMap<NodeId, String>
where
    I: IntoIterator<Item = (NodeId, &'a str)>,
{
    let mut taken: Vec<String> = Vec::new();
    let mut out = BTreeMap::new();
    for (id, name) in items {
        let mut ident = sanitize_ident(name);
        if taken.contains(&ident) {
            ident = format!("{ident}_{}", id.0);
        }
        taken.push(ident.clone());
        out.insert(id, ident);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_punctuation() {
        assert_eq!(sanitize_ident("lstm.h[0]"), "lstm_h_0_");
        assert_eq!(sanitize_ident("plain"), "plain");
    }

    #[test]
    fn sanitize_guards_leading_digit() {
        assert_eq!(sanitize_ident("0bias"), "_0bias");
        assert_eq!(sanitize_ident(""), "_");
    }

    #[test]
    fn collisions_get_id_suffix() {
        let idents = unique_idents(vec![
            (NodeId(0), "a.b"),
            (NodeId(1), "a_b"),
            (NodeId(2), "c"),
        ]);
        assert_eq!(idents[&NodeId(0)], "a_b");
        assert_eq!(idents[&NodeId(1)], "a_b_1");
        assert_eq!(idents[&NodeId(2)], "c");
    }
}
