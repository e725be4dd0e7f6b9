use std::path::Path;

use tokio::sync::watch;
use tracing::info;

use crate::edit::{self, EditError, NewNode};
use crate::export::{self, ExportError, ExportReport};
use crate::node::{is_valid_namespace, NodeId, NodeStore};
use crate::project::{create_workspace, Project, ProjectSetup, Workspace};
use crate::templates;
use crate::validation::{validate, Diagnostic};

/// The workspace being edited.
///
/// Every successful operation swaps in a new store and publishes the whole
/// workspace to subscribers (the autosave task, views). Failed operations
/// publish nothing.
#[derive(Debug)]
pub struct Session {
    workspace: Workspace,
    changes: watch::Sender<Workspace>,
}

impl Session {
    /// Starts a session on an existing workspace, such as a loaded snapshot.
    pub fn new(workspace: Workspace) -> Self {
        let (changes, _) = watch::channel(workspace.clone());
        Self { workspace, changes }
    }

    /// Starts a session from setup wizard answers.
    pub fn create(setup: &ProjectSetup) -> Result<Self, EditError> {
        Ok(Self::new(create_workspace(setup)?))
    }

    /// Receives every later change. The current state counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<Workspace> {
        self.changes.subscribe()
    }

    /// The current workspace.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn project(&self) -> &Project {
        &self.workspace.project
    }

    pub fn store(&self) -> &NodeStore {
        &self.workspace.store
    }

    fn publish(&self) {
        self.changes.send_replace(self.workspace.clone());
    }

    fn commit(&mut self, store: NodeStore) {
        self.workspace.store = store;
        self.publish();
    }

    /// Creates a file or folder. See [`edit::create_node`].
    pub fn create_node(
        &mut self,
        parent: Option<&NodeId>,
        name: &str,
        new_node: NewNode,
    ) -> Result<NodeId, EditError> {
        let (store, id) = edit::create_node(self.store(), parent, name, new_node)?;
        self.commit(store);
        Ok(id)
    }

    pub fn rename(&mut self, id: &NodeId, name: &str) -> Result<(), EditError> {
        let store = edit::rename_node(self.store(), id, name)?;
        self.commit(store);
        Ok(())
    }

    /// Deletes a node and everything below it. Returns the number of nodes
    /// removed.
    pub fn delete(&mut self, id: &NodeId) -> Result<usize, EditError> {
        let (store, removed) = edit::delete_node(self.store(), id)?;
        self.commit(store);
        Ok(removed)
    }

    pub fn duplicate(&mut self, id: &NodeId) -> Result<NodeId, EditError> {
        let (store, copy) = edit::duplicate_node(self.store(), id)?;
        self.commit(store);
        Ok(copy)
    }

    pub fn set_content(&mut self, id: &NodeId, content: &str) -> Result<(), EditError> {
        let store = edit::set_content(self.store(), id, content)?;
        self.commit(store);
        Ok(())
    }

    pub fn move_node(&mut self, id: &NodeId, new_parent: Option<&NodeId>) -> Result<(), EditError> {
        let store = edit::move_node(self.store(), id, new_parent)?;
        self.commit(store);
        Ok(())
    }

    /// Renders a catalog template for this project and files it under
    /// `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::UnknownTemplate`] if `template_id` is not in the
    /// catalog, or any error of [`edit::instantiate_template`].
    pub fn add_template(
        &mut self,
        parent: &NodeId,
        template_id: &str,
        name: &str,
    ) -> Result<NodeId, EditError> {
        let template = templates::find(template_id)
            .ok_or_else(|| EditError::UnknownTemplate(template_id.to_string()))?;
        let project = self.project();
        let generated = template.render(&project.namespace, name, &project.target_version);
        let (store, id) = edit::instantiate_template(
            self.store(),
            parent,
            generated.folders,
            &generated.file_name,
            &generated.content,
        )?;
        self.commit(store);
        Ok(id)
    }

    /// Replaces the project metadata. The namespace must be valid; other
    /// fields are checked by [`validate`].
    pub fn update_project(&mut self, project: Project) -> Result<(), EditError> {
        if !is_valid_namespace(&project.namespace) {
            return Err(EditError::InvalidNamespace(project.namespace));
        }
        self.workspace.project = project;
        self.publish();
        Ok(())
    }

    /// Discards the project and tree and starts again from `setup`.
    pub fn reset(&mut self, setup: &ProjectSetup) -> Result<(), EditError> {
        self.workspace = create_workspace(setup)?;
        info!(name = %setup.name, "reset workspace");
        self.publish();
        Ok(())
    }

    /// Runs [`validate`] on the current state.
    pub fn validate(&self) -> Vec<Diagnostic> {
        validate(self.project(), self.store())
    }

    /// Exports the current state. See [`export::export_to_dir`].
    pub fn export(&self, dir: &Path, confirmed: bool) -> Result<ExportReport, ExportError> {
        export::export_to_dir(self.project(), self.store(), dir, confirmed)
    }
}
