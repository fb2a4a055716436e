//! Page model: the ordered list that defines output order
//!
//! All mutation goes through [`PageList`]'s methods. Every command is a
//! no-op when its target is absent, and untouched pages keep their
//! relative order.

use crate::types::{PageDescriptor, PageId, SourceId};

#[derive(Debug, Clone, Default)]
pub struct PageList {
    pages: Vec<PageDescriptor>,
}

impl PageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append pages at the end. Pages whose id is already present are ignored.
    pub fn append(&mut self, new_pages: Vec<PageDescriptor>) -> &[PageDescriptor] {
        for page in new_pages {
            if self.position(page.id()).is_some() {
                log::warn!("Ignoring duplicate {}", page.id());
                continue;
            }
            self.pages.push(page);
        }
        &self.pages
    }

    /// Move a page to `target_index`, clamped to the list bounds
    pub fn reorder(&mut self, id: PageId, target_index: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let to = target_index.min(self.pages.len() - 1);
        if from == to {
            return false;
        }
        let page = self.pages.remove(from);
        self.pages.insert(to, page);
        true
    }

    /// Turn a page a further 90° clockwise
    pub fn rotate(&mut self, id: PageId) -> bool {
        match self.pages.iter_mut().find(|p| p.id() == id) {
            Some(page) => {
                page.rotation = page.rotation.rotated();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: PageId) -> bool {
        match self.position(id) {
            Some(idx) => {
                self.pages.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Drop every page derived from `source_id`; returns how many went
    pub fn remove_by_source(&mut self, source_id: SourceId) -> usize {
        let before = self.pages.len();
        self.pages.retain(|p| p.source_id() != source_id);
        before - self.pages.len()
    }

    pub fn get(&self, id: PageId) -> Option<&PageDescriptor> {
        self.pages.iter().find(|p| p.id() == id)
    }

    pub fn position(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id() == id)
    }

    pub fn as_slice(&self) -> &[PageDescriptor] {
        &self.pages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageDescriptor> {
        self.pages.iter()
    }

    pub fn ids(&self) -> Vec<PageId> {
        self.pages.iter().map(PageDescriptor::id).collect()
    }

    /// Owned copy of the current order, for handing to assembly
    pub fn snapshot(&self) -> Vec<PageDescriptor> {
        self.pages.clone()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl<'a> IntoIterator for &'a PageList {
    type Item = &'a PageDescriptor;
    type IntoIter = std::slice::Iter<'a, PageDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}
