use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::remote::{ChildFilter, ListingEntry, NameMatch, RemoteError, RemoteStore};
use crate::upload::FolderDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindFolder {
        parent: String,
        name: String,
    },
    FindContaining {
        parent: String,
        fragment: String,
    },
    Create {
        parent: String,
        name: String,
    },
    Upload {
        parent: String,
        name: String,
        mime_type: String,
    },
}

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    name: String,
    parent: String,
    folder: bool,
    trashed: bool,
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    calls: Vec<Call>,
    next_id: usize,
}

/// In-memory store recording every remote call in order.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
    failing_query_parent: Option<String>,
    failing_create_name: Option<String>,
    failing_upload: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(self, id: &str, name: &str, parent: &str) -> Self {
        self.with_entry(id, name, parent, true, false)
    }

    pub fn with_trashed_folder(self, id: &str, name: &str, parent: &str) -> Self {
        self.with_entry(id, name, parent, true, true)
    }

    pub fn with_file(self, id: &str, name: &str, parent: &str) -> Self {
        self.with_entry(id, name, parent, false, false)
    }

    pub fn failing_queries_under(mut self, parent: &str) -> Self {
        self.failing_query_parent = Some(parent.to_string());
        self
    }

    pub fn failing_create_of(mut self, name: &str) -> Self {
        self.failing_create_name = Some(name.to_string());
        self
    }

    pub fn failing_upload(mut self) -> Self {
        self.failing_upload = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn children_of(&self, parent: &str) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|e| e.parent == parent)
            .map(|e| (e.id.clone(), e.name.clone()))
            .collect()
    }

    fn with_entry(self, id: &str, name: &str, parent: &str, folder: bool, trashed: bool) -> Self {
        self.state.lock().unwrap().entries.push(Entry {
            id: id.to_string(),
            name: name.to_string(),
            parent: parent.to_string(),
            folder,
            trashed,
        });
        self
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    fn root(&self) -> FolderDescriptor {
        FolderDescriptor::root("root", "My Drive")
    }

    async fn list_children(
        &self,
        parent_id: &str,
        filter: ChildFilter<'_>,
    ) -> Result<Vec<ListingEntry>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(match filter.name {
            NameMatch::Exact(name) => Call::FindFolder {
                parent: parent_id.to_string(),
                name: name.to_string(),
            },
            NameMatch::Contains(fragment) => Call::FindContaining {
                parent: parent_id.to_string(),
                fragment: fragment.to_string(),
            },
        });
        if self.failing_query_parent.as_deref() == Some(parent_id) {
            return Err(RemoteError::Rejected("listing unavailable".into()));
        }
        Ok(state
            .entries
            .iter()
            .filter(|e| e.parent == parent_id)
            .filter(|e| filter.include_trashed || !e.trashed)
            .filter(|e| !filter.folders_only || e.folder)
            .filter(|e| match filter.name {
                NameMatch::Exact(name) => e.name == name,
                NameMatch::Contains(fragment) => e.name.contains(fragment),
            })
            .map(|e| ListingEntry {
                id: e.id.clone(),
                name: e.name.clone(),
                parents: vec![e.parent.clone()],
            })
            .collect())
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            parent: parent_id.to_string(),
            name: name.to_string(),
        });
        if self.failing_create_name.as_deref() == Some(name) {
            return Err(RemoteError::Rejected("quota exceeded".into()));
        }
        state.next_id += 1;
        let id = format!("new-{}", state.next_id);
        state.entries.push(Entry {
            id: id.clone(),
            name: name.to_string(),
            parent: parent_id.to_string(),
            folder: true,
            trashed: false,
        });
        Ok(id)
    }

    async fn upload_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        _local_path: &Path,
    ) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Upload {
            parent: parent_id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
        });
        if self.failing_upload {
            return Err(RemoteError::Rejected("upload interrupted".into()));
        }
        state.next_id += 1;
        let id = format!("file-{}", state.next_id);
        state.entries.push(Entry {
            id: id.clone(),
            name: name.to_string(),
            parent: parent_id.to_string(),
            folder: false,
            trashed: false,
        });
        Ok(id)
    }
}
