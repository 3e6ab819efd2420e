use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use jobhop::errors::Result;
use jobhop::session::{BoxFuture, CommandOutput, Transport};

/// A scripted transport that:
/// - records every command line it is asked to run
/// - answers with the queued outputs of the first rule whose needle occurs
///   in the command; the last queued output of a rule repeats forever
/// - answers anything unmatched with an empty, successful output.
///
/// Clones share state, so a test can keep one handle after boxing another
/// into a `Session`.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Debug, Default)]
struct FakeState {
    rules: Vec<Rule>,
    calls: Vec<String>,
}

#[derive(Debug)]
struct Rule {
    needle: String,
    outputs: VecDeque<CommandOutput>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` for commands containing `needle`.
    pub fn on(&self, needle: &str, output: CommandOutput) -> &Self {
        let mut state = self.state.lock().unwrap();
        match state.rules.iter_mut().find(|r| r.needle == needle) {
            Some(rule) => rule.outputs.push_back(output),
            None => state.rules.push(Rule {
                needle: needle.to_string(),
                outputs: VecDeque::from([output]),
            }),
        }
        self
    }

    /// Every command line received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of received command lines containing `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }

    fn answer(&self, command: &str) -> CommandOutput {
        let mut state = self.state.lock().unwrap();
        state.calls.push(command.to_string());
        let Some(rule) = state.rules.iter_mut().find(|r| command.contains(&r.needle)) else {
            return CommandOutput::success("");
        };
        if rule.outputs.len() > 1 {
            rule.outputs.pop_front().unwrap_or_default()
        } else {
            rule.outputs.front().cloned().unwrap_or_default()
        }
    }
}

impl Transport for FakeTransport {
    fn kind(&self) -> &'static str {
        "fake"
    }

    fn execute<'a>(
        &'a self,
        command: &'a str,
        _stdin: Option<&'a [u8]>,
    ) -> BoxFuture<'a, Result<CommandOutput>> {
        let output = self.answer(command);
        Box::pin(async move { Ok(output) })
    }
}
