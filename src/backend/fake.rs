//! In-memory backend for session and worker tests.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::{Backend, BackendError, UploadPart};
use crate::tenant::{Gstin, RegistryKey};

#[derive(Debug, Default)]
struct State {
    files: HashMap<RegistryKey, Vec<String>>,
    reports: HashMap<String, Vec<(String, Vec<u8>)>>,
    open_reports: bool,
    check_error: Option<BackendError>,
    generate_error: Option<BackendError>,
    upload_error: Option<BackendError>,
    calls: HashMap<&'static str, usize>,
}

/// Stores uploads per key and answers like the real service.
#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn count(&self, call: &'static str) {
        *self.state().calls.entry(call).or_default() += 1;
    }

    pub fn calls(&self, call: &str) -> usize {
        self.state().calls.get(call).copied().unwrap_or(0)
    }

    pub fn seed_files(&self, key: &RegistryKey, names: &[&str]) {
        self.state()
            .files
            .insert(key.clone(), names.iter().map(|n| n.to_string()).collect());
    }

    pub fn files(&self, key: &RegistryKey) -> Vec<String> {
        self.state().files.get(key).cloned().unwrap_or_default()
    }

    pub fn put_report(&self, gstin: &str, name: &str, bytes: Vec<u8>) {
        self.state()
            .reports
            .entry(gstin.to_string())
            .or_default()
            .push((name.to_string(), bytes));
    }

    pub fn set_open_reports(&self, open: bool) {
        self.state().open_reports = open;
    }

    pub fn fail_check(&self, err: BackendError) {
        self.state().check_error = Some(err);
    }

    pub fn fail_generate(&self, err: BackendError) {
        self.state().generate_error = Some(err);
    }

    pub fn fail_upload(&self, err: BackendError) {
        self.state().upload_error = Some(err);
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn upload(
        &self,
        key: &RegistryKey,
        parts: Vec<UploadPart>,
    ) -> Result<Vec<String>, BackendError> {
        self.count("upload");
        let mut state = self.state();
        if let Some(err) = state.upload_error.clone() {
            return Err(err);
        }
        let stored = state.files.entry(key.clone()).or_default();
        let mut paths = Vec::new();
        for part in parts {
            // Re-uploading a name overwrites it.
            if !stored.contains(&part.name) {
                stored.push(part.name.clone());
            }
            paths.push(format!("{}/{}/{}", key.gstin, key.category, part.name));
        }
        Ok(paths)
    }

    async fn list_files(&self, key: &RegistryKey) -> Result<Vec<String>, BackendError> {
        self.count("list_files");
        Ok(self.files(key))
    }

    async fn delete_file(&self, key: &RegistryKey, name: &str) -> Result<(), BackendError> {
        self.count("delete_file");
        let mut state = self.state();
        let stored = state.files.entry(key.clone()).or_default();
        match stored.iter().position(|n| n == name) {
            Some(idx) => {
                stored.remove(idx);
                Ok(())
            }
            None => Err(BackendError::Rejected {
                status: 404,
                body: format!("{name} not found"),
            }),
        }
    }

    async fn check_open_reports(&self, _gstin: &Gstin) -> Result<bool, BackendError> {
        self.count("check_open_reports");
        let state = self.state();
        match state.check_error.clone() {
            Some(err) => Err(err),
            None => Ok(state.open_reports),
        }
    }

    async fn generate(&self, gstin: &Gstin) -> Result<Vec<String>, BackendError> {
        self.count("generate");
        let mut state = self.state();
        if let Some(err) = state.generate_error.clone() {
            return Err(err);
        }
        let name = format!("{gstin}_master.xlsx");
        let reports = state.reports.entry(gstin.to_string()).or_default();
        if !reports.iter().any(|(n, _)| *n == name) {
            reports.push((name.clone(), Vec::new()));
        }
        Ok(vec![name])
    }

    async fn list_reports(&self, gstin: &Gstin) -> Result<Vec<String>, BackendError> {
        self.count("list_reports");
        Ok(self
            .state()
            .reports
            .get(gstin.as_str())
            .map(|r| r.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default())
    }

    async fn fetch_report(&self, gstin: &Gstin, name: &str) -> Result<Vec<u8>, BackendError> {
        self.count("fetch_report");
        self.state()
            .reports
            .get(gstin.as_str())
            .and_then(|r| r.iter().find(|(n, _)| n == name))
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| BackendError::Rejected {
                status: 404,
                body: format!("{name} not found"),
            })
    }
}
