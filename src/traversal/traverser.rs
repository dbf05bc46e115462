//! Traversers: the unit of flow through an executing traversal

use crate::translation::Pop;
use crate::types::Value;
use smallvec::SmallVec;

#[derive(Debug, Clone)]
struct PathEntry {
    labels: SmallVec<[String; 1]>,
    object: Value,
}

/// Current object plus labelled path history and loop counters.
#[derive(Debug, Clone)]
pub struct Traverser {
    object: Value,
    path: Vec<PathEntry>,
    /// One counter per enclosing `repeat()`
    loops: SmallVec<[u32; 2]>,
}

impl Traverser {
    pub fn new(object: Value) -> Self {
        Self {
            path: vec![PathEntry {
                labels: SmallVec::new(),
                object: object.clone(),
            }],
            object,
            loops: SmallVec::new(),
        }
    }

    pub fn get(&self) -> &Value {
        &self.object
    }

    pub fn into_object(self) -> Value {
        self.object
    }

    /// Child traverser moved on to `object`, extending the path.
    pub fn split(&self, object: Value) -> Self {
        let mut path = self.path.clone();
        path.push(PathEntry {
            labels: SmallVec::new(),
            object: object.clone(),
        });
        Self {
            object,
            path,
            loops: self.loops.clone(),
        }
    }

    /// Label the current path position.
    pub fn add_label(&mut self, label: &str) {
        match self.path.last_mut() {
            Some(entry) => {
                if !entry.labels.iter().any(|l| l == label) {
                    entry.labels.push(label.to_string());
                }
            }
            None => self.path.push(PathEntry {
                labels: SmallVec::from_elem(label.to_string(), 1),
                object: self.object.clone(),
            }),
        }
    }

    pub fn path_objects(&self) -> Vec<Value> {
        self.path.iter().map(|e| e.object.clone()).collect()
    }

    /// Objects labelled `label`, according to `pop`.
    pub fn path_value(&self, pop: Pop, label: &str) -> Option<Value> {
        let mut matches = self
            .path
            .iter()
            .filter(|e| e.labels.iter().any(|l| l == label))
            .map(|e| e.object.clone());
        match pop {
            Pop::First => matches.next(),
            Pop::Last => matches.last(),
            Pop::All => Some(Value::List(matches.collect())),
            Pop::Mixed => {
                let mut all: Vec<Value> = matches.collect();
                match all.len() {
                    0 => None,
                    1 => all.pop(),
                    _ => Some(Value::List(all)),
                }
            }
        }
    }

    pub fn loops(&self) -> u32 {
        self.loops.last().copied().unwrap_or(0)
    }

    pub fn enter_loop(&mut self) {
        self.loops.push(0);
    }

    pub fn incr_loops(&mut self) {
        if let Some(counter) = self.loops.last_mut() {
            *counter += 1;
        }
    }

    pub fn exit_loop(&mut self) {
        self.loops.pop();
    }
}
