//! Copy-on-write set of appender controls

use super::appender_control::AppenderControl;
use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Readers take a snapshot with [`get`](Self::get) and never block; writers
/// publish a new array with a compare-and-swap retry loop.
#[derive(Debug)]
pub struct AppenderControlSet {
    controls: ArcSwap<Vec<Arc<AppenderControl>>>,
}

impl AppenderControlSet {
    pub fn new() -> Self {
        Self {
            controls: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Add a control unless one for the same appender name is present
    pub fn add(&self, control: Arc<AppenderControl>) -> bool {
        loop {
            let current = self.controls.load_full();
            if current.iter().any(|existing| **existing == *control) {
                return false;
            }
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&control));
            let previous = self.controls.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &current) {
                return true;
            }
        }
    }

    /// Remove the control for `name`, returning it
    pub fn remove(&self, name: &str) -> Option<Arc<AppenderControl>> {
        loop {
            let current = self.controls.load_full();
            let pos = current.iter().position(|c| c.appender_name() == name)?;
            let removed = Arc::clone(&current[pos]);
            let next: Vec<_> = current
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != pos)
                .map(|(_, c)| Arc::clone(c))
                .collect();
            let previous = self.controls.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &current) {
                return Some(removed);
            }
        }
    }

    /// Atomically empty the set, returning what it held
    pub fn clear(&self) -> Vec<Arc<AppenderControl>> {
        let previous = self.controls.swap(Arc::new(Vec::new()));
        previous.iter().cloned().collect()
    }

    /// Lock-free snapshot in insertion order
    #[inline]
    pub fn get(&self) -> Arc<Vec<Arc<AppenderControl>>> {
        self.controls.load_full()
    }

    pub fn as_map(&self) -> BTreeMap<String, Arc<AppenderControl>> {
        self.controls
            .load()
            .iter()
            .map(|c| (c.appender_name().to_string(), Arc::clone(c)))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controls.load().iter().any(|c| c.appender_name() == name)
    }

    pub fn len(&self) -> usize {
        self.controls.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.load().is_empty()
    }
}

impl Default for AppenderControlSet {
    fn default() -> Self {
        Self::new()
    }
}
