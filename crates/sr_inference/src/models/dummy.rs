use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use sr_core::{Error, HookType, Result, TextGenerator};

type Scripted<T> = Mutex<VecDeque<Result<T>>>;

/// Generator that replays scripted responses in order.
///
/// Once a queue runs dry every further call fails, which the repair loop
/// treats like any other generator error.
#[derive(Default)]
pub struct DummyModel {
    generations: Scripted<Vec<String>>,
    repairs: Scripted<String>,
    generate_calls: AtomicUsize,
    repair_calls: AtomicUsize,
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel")
            .field("generate_calls", &self.generate_calls())
            .field("repair_calls", &self.repair_calls())
            .finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful generation returning these bullets.
    pub fn with_bullets<S: Into<String>>(self, bullets: impl IntoIterator<Item = S>) -> Self {
        self.push_generation(Ok(bullets.into_iter().map(Into::into).collect()));
        self
    }

    /// Queue a failing generation.
    pub fn with_generation_error(self, message: &str) -> Self {
        self.push_generation(Err(Error::Inference(message.to_string())));
        self
    }

    /// Queue a successful repair.
    pub fn with_repair(self, hook: impl Into<String>) -> Self {
        self.push_repair(Ok(hook.into()));
        self
    }

    /// Queue a failing repair.
    pub fn with_repair_error(self, message: &str) -> Self {
        self.push_repair(Err(Error::Inference(message.to_string())));
        self
    }

    pub fn push_generation(&self, response: Result<Vec<String>>) {
        self.generations.lock().unwrap_or_else(|e| e.into_inner()).push_back(response);
    }

    pub fn push_repair(&self, response: Result<String>) {
        self.repairs.lock().unwrap_or_else(|e| e.into_inner()).push_back(response);
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn repair_calls(&self) -> usize {
        self.repair_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.generate_calls() + self.repair_calls()
    }
}

fn next<T>(queue: &Scripted<T>, what: &str) -> Result<T> {
    queue
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .pop_front()
        .unwrap_or_else(|| Err(Error::Inference(format!("no scripted {} left", what))))
}

#[async_trait::async_trait]
impl TextGenerator for DummyModel {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn generate(&self, _prompt: &str) -> Result<Vec<String>> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.generations, "generation")
    }

    async fn repair(&self, _text: &str, _hook_type: HookType) -> Result<String> {
        self.repair_calls.fetch_add(1, Ordering::SeqCst);
        next(&self.repairs, "repair")
    }
}
