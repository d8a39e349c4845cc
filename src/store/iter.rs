use crate::models::Item;

/// Depth-first, pre-order iterator over a slice of items and their descendants.
pub struct Iter<'a> {
    stack: Vec<&'a Item>,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(items: &'a [Item]) -> Self {
        Self {
            stack: items.iter().rev().collect(),
        }
    }

    /// Walk `item` itself followed by its whole subtree.
    pub(crate) fn from_item(item: &'a Item) -> Self {
        Self { stack: vec![item] }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.stack.pop()?;
        self.stack.extend(item.children().iter().rev());
        Some(item)
    }
}
