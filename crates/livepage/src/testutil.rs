//! Test doubles shared by unit tests.

use indexmap::IndexMap;
use livepage_path::NodePath;
use serde_json::Value;

use crate::error::ClientError;
use crate::host::{EvalOutcome, HostIo, Location};
use crate::protocol::LocationKind;

/// A [`HostIo`] that records every call.
#[derive(Debug, Default)]
pub(crate) struct RecordingHost {
    pub location: Location,
    pub set_locations: Vec<(LocationKind, String)>,
    pub focused: Vec<NodePath>,
    pub css_reloads: u32,
    pub window_properties: IndexMap<String, Value>,
    pub evals: Vec<(String, String)>,
    pub eval_outcome: Option<EvalOutcome>,
    pub form_uploads: Vec<(NodePath, String, IndexMap<String, String>)>,
    pub file_listings: Vec<(NodePath, String)>,
    pub file_uploads: Vec<(NodePath, String, String)>,
    pub missing_file: Option<String>,
}

impl HostIo for RecordingHost {
    fn location(&self) -> Location {
        self.location.clone()
    }

    fn set_location(&mut self, kind: LocationKind, value: &str) {
        self.set_locations.push((kind, value.to_string()));
    }

    fn focus(&mut self, path: &NodePath) {
        self.focused.push(path.clone());
    }

    fn reload_css(&mut self) {
        self.css_reloads += 1;
    }

    fn eval(&mut self, descriptor: &str, code: &str) -> EvalOutcome {
        self.evals.push((descriptor.to_string(), code.to_string()));
        self.eval_outcome.clone().unwrap_or(EvalOutcome::Pending)
    }

    fn window_property(&self, name: &str) -> Option<Value> {
        self.window_properties.get(name).cloned()
    }

    fn set_window_property(&mut self, name: &str, value: &Value) {
        self.window_properties
            .insert(name.to_string(), value.clone());
    }

    fn upload_form(
        &mut self,
        path: &NodePath,
        descriptor: &str,
        fields: &IndexMap<String, String>,
    ) -> Result<(), ClientError> {
        self.form_uploads
            .push((path.clone(), descriptor.to_string(), fields.clone()));
        Ok(())
    }

    fn list_files(&mut self, path: &NodePath, descriptor: &str) -> Result<(), ClientError> {
        self.file_listings
            .push((path.clone(), descriptor.to_string()));
        Ok(())
    }

    fn upload_file(
        &mut self,
        path: &NodePath,
        descriptor: &str,
        file_name: &str,
    ) -> Result<(), ClientError> {
        if self.missing_file.as_deref() == Some(file_name) {
            return Err(ClientError::Upload(format!(
                "no file named {file_name:?} in the selected set"
            )));
        }
        self.file_uploads
            .push((path.clone(), descriptor.to_string(), file_name.to_string()));
        Ok(())
    }
}
