//! Shared harness for the integration suite.

#![allow(dead_code)]

use std::time::Instant;

use indexmap::IndexMap;
use livepage::{
    ClientConfig, ClientError, EvalOutcome, HostIo, LivePage, Location, LocationKind,
    MemoryDebugStore, NodePath, Tree,
};
use serde_json::Value;

/// A [`HostIo`] that records every call and answers from canned state.
#[derive(Debug, Default)]
pub struct RecordingHost {
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

pub type TestPage = LivePage<RecordingHost, MemoryDebugStore>;

/// A fresh page over an empty `body` root, heartbeat disabled.
pub fn page() -> (TestPage, Instant) {
    page_with_config(ClientConfig::default())
}

pub fn page_with_config(config: ClientConfig) -> (TestPage, Instant) {
    init_tracing();
    let now = Instant::now();
    let page = LivePage::new(
        config,
        Tree::new("body"),
        RecordingHost::default(),
        MemoryDebugStore::default(),
        now,
    );
    (page, now)
}

/// Installs a fmt subscriber once so `--nocapture` runs show the
/// runtime's diagnostics.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Parses an encoded outbound frame back to JSON for assertions.
pub fn parse_frame(frame: &str) -> Value {
    serde_json::from_str(frame).expect("outbound frame is valid JSON")
}

pub fn path(s: &str) -> NodePath {
    NodePath::parse(s).expect("valid test path")
}
