use std::collections::HashMap;

/// Engine-wide style-name ↔ style-id registry.
///
/// One mapping is shared by every grammar compiled through a
/// [`HighlightEngine`](crate::json_syntax::HighlightEngine), so ids stay
/// consistent across grammars and embedded-language states reuse the
/// referenced grammar's ids. Hosts may pin ids up front with
/// [`register`](Self::register); names seen afterwards are allocated the
/// lowest free id.
#[derive(Debug, Default)]
pub struct StyleMapping {
    name_to_id: HashMap<String, i32>,
    id_to_name: HashMap<i32, String>,
    next_id: i32,
}

impl StyleMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `name` to an explicit id.
    pub fn register(&mut self, name: &str, id: i32) {
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.insert(id, name.to_string());
    }

    /// Get the id for `name`, allocating the lowest free id if unseen.
    pub fn style_id_for_name(&mut self, name: &str) -> i32 {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        while self.id_to_name.contains_key(&self.next_id) {
            self.next_id += 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.register(name, id);
        id
    }

    /// Look up the id for `name` without allocating.
    pub fn style_id(&self, name: &str) -> Option<i32> {
        self.name_to_id.get(name).copied()
    }

    /// Style name for a previously allocated id.
    pub fn style_name(&self, id: i32) -> Option<&str> {
        self.id_to_name.get(&id).map(|name| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_allocation() {
        let mut mapping = StyleMapping::new();
        assert_eq!(mapping.style_id_for_name("keyword"), 0);
        assert_eq!(mapping.style_id_for_name("string"), 1);
        assert_eq!(mapping.style_id_for_name("keyword"), 0);
        assert_eq!(mapping.style_name(1), Some("string"));
    }

    #[test]
    fn test_registered_ids_are_skipped() {
        let mut mapping = StyleMapping::new();
        mapping.register("keyword", 0);
        mapping.register("comment", 1);
        assert_eq!(mapping.style_id_for_name("keyword"), 0);
        assert_eq!(mapping.style_id_for_name("string"), 2);
    }

    #[test]
    fn test_lookup_without_allocation() {
        let mapping = StyleMapping::new();
        assert_eq!(mapping.style_id("keyword"), None);
        assert_eq!(mapping.style_name(0), None);
    }
}
