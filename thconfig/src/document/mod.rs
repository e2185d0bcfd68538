use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered multimap from statement key to every occurrence of that key.
///
/// Keys iterate in the order they were first pushed; occurrences of one key
/// keep their input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Children {
    entries: IndexMap<String, Vec<Node>>,
}

impl Children {
    pub fn new() -> Self {
        Children {
            entries: IndexMap::new(),
        }
    }

    /// Append `node` to the occurrences of `key`, starting the sequence on
    /// first use.
    pub fn push(&mut self, key: impl Into<String>, node: Node) {
        self.entries.entry(key.into()).or_default().push(node);
    }

    pub fn get(&self, key: &str) -> &[Node] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<&Node> {
        self.get(key).first()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Node])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One `key value` statement, with any statements nested beneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub value: String,
    #[serde(default)]
    pub children: Children,
}

impl Node {
    pub fn new(value: impl Into<String>) -> Self {
        Node {
            value: value.into(),
            children: Children::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The value split on newlines. Only code blocks have more than one.
    pub fn value_lines(&self) -> std::str::Split<'_, char> {
        self.value.split('\n')
    }
}

/// A parsed config file: the children of an unnamed root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub root: Children,
}

impl Document {
    pub fn new(root: Children) -> Self {
        Document { root }
    }

    pub fn get(&self, key: &str) -> &[Node] {
        self.root.get(key)
    }

    pub fn first(&self, key: &str) -> Option<&Node> {
        self.root.first(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Node])> {
        self.root.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Follow a `/`-separated key path, taking the first occurrence of each
    /// key along the way.
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        let mut keys = path.split('/').filter(|k| !k.is_empty());
        let mut node = self.root.first(keys.next()?)?;
        for key in keys {
            node = node.children.first(key)?;
        }
        Some(node)
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Keys are strings and values are strings or maps, so this cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn to_json_string_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Arena used while a document is being built.
///
/// Nodes are addressed by index so the open-parent stack can hold plain
/// `usize` handles. Truncating that stack never drops arena entries.
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    slots: Vec<Slot>,
    top: Vec<(String, usize)>,
}

#[derive(Debug)]
struct Slot {
    value: String,
    children: Vec<(String, usize)>,
}

impl NodeArena {
    /// Allocate a node under `parent` (or the root when `None`) and return
    /// its handle.
    pub(crate) fn insert(&mut self, parent: Option<usize>, key: &str, value: String) -> usize {
        let id = self.slots.len();
        self.slots.push(Slot {
            value,
            children: Vec::new(),
        });
        let siblings = match parent {
            Some(p) => &mut self.slots[p].children,
            None => &mut self.top,
        };
        siblings.push((key.to_string(), id));
        id
    }

    pub(crate) fn into_document(mut self) -> Document {
        let top = std::mem::take(&mut self.top);
        Document::new(self.collect(top))
    }

    fn collect(&mut self, entries: Vec<(String, usize)>) -> Children {
        let mut children = Children::new();
        for (key, id) in entries {
            let value = std::mem::take(&mut self.slots[id].value);
            let nested = std::mem::take(&mut self.slots[id].children);
            let node = Node {
                value,
                children: self.collect(nested),
            };
            children.push(key, node);
        }
        children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn repeated_keys_keep_order() {
        let mut children = Children::new();
        children.push("select", Node::new("a"));
        children.push("source", Node::new("main.th"));
        children.push("select", Node::new("b"));

        assert_eq!(children.keys().collect::<Vec<_>>(), vec!["select", "source"]);
        let values: Vec<&str> = children.get("select").iter().map(|n| n.value.as_str()).collect();
        assert_eq!(values, vec!["a", "b"]);
        assert!(children.get("missing").is_empty());
    }

    #[test]
    fn json_shape() {
        let mut inner = Node::new("cave1");
        inner.children.push("title", Node::new("\"Main cave\""));
        let mut root = Children::new();
        root.push("survey", inner);
        let doc = Document::new(root);

        assert_eq!(
            doc.to_json(),
            json!({
                "survey": [{
                    "value": "cave1",
                    "children": {"title": [{"value": "\"Main cave\"", "children": {}}]}
                }]
            })
        );
    }

    #[test]
    fn json_back_to_document_preserves_key_order() {
        let text = r#"{"zeta": [{"value": "1"}], "alpha": [{"value": "2", "children": {}}]}"#;
        let doc: Document = serde_json::from_str(text).unwrap();
        assert_eq!(doc.root.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert!(doc.first("zeta").unwrap().is_leaf());
    }

    #[test]
    fn lookup_follows_first_occurrence() {
        let mut centerline = Node::new("");
        centerline.children.push("data", Node::new("normal from to"));
        let mut survey = Node::new("cave1");
        survey.children.push("centerline", centerline);
        let mut root = Children::new();
        root.push("survey", survey);
        root.push("survey", Node::new("cave2"));
        let doc = Document::new(root);

        assert_eq!(doc.lookup("survey").unwrap().value, "cave1");
        assert_eq!(doc.lookup("survey/centerline/data").unwrap().value, "normal from to");
        assert!(doc.lookup("survey/map").is_none());
        assert!(doc.lookup("").is_none());
    }

    #[test]
    fn arena_builds_nested_tree() {
        let mut arena = NodeArena::default();
        let survey = arena.insert(None, "survey", "cave1".into());
        let cl = arena.insert(Some(survey), "centerline", String::new());
        arena.insert(Some(cl), "data", "normal".into());
        arena.insert(Some(cl), "data", "diving".into());
        arena.insert(None, "layout", "l1".into());

        let doc = arena.into_document();
        let data = doc.lookup("survey/centerline").unwrap().children.get("data");
        assert_eq!(data.len(), 2);
        assert_eq!(data[1].value, "diving");
        assert_eq!(doc.first("layout").unwrap().value, "l1");
    }
}
