use crate::scene_graph::ObjectId;

/// Objects currently highlighted by the outline pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    objects: Vec<ObjectId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains(&id)
    }

    pub fn insert(&mut self, id: ObjectId) {
        if !self.contains(id) {
            self.objects.push(id);
        }
    }

    /// Replaces the whole selection.
    pub fn set(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.objects.clear();
        for id in ids {
            self.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
