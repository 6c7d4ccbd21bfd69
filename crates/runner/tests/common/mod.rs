#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use chloe_runner::{EngineCommand, EngineLauncher, EngineProcess, FeedbackEvent, FeedbackSink};

/// What one scripted launch does.
pub enum Attempt {
    /// `launch` itself fails.
    FailToStart,
    /// Yields these raw lines, then end of stream.
    Lines(Vec<Vec<u8>>),
    /// Yields these raw lines, then a read error.
    LinesThenError(Vec<Vec<u8>>),
    /// Yields these raw lines, then never returns another.
    LinesThenHang(Vec<Vec<u8>>),
}

pub fn lines(lines: &[&str]) -> Vec<Vec<u8>> {
    lines.iter().map(|l| format!("{l}\n").into_bytes()).collect()
}

/// Counters shared between a [`ScriptedLauncher`] and the test.
#[derive(Default)]
pub struct Probe {
    pub launches: AtomicU32,
    pub reads: AtomicUsize,
    pub terminated: AtomicBool,
    /// Launch count seen by each `terminate` call.
    pub terminated_during_launch: Mutex<Vec<u32>>,
    pub commands: Mutex<Vec<Vec<String>>>,
    pub working_dirs: Mutex<Vec<PathBuf>>,
}

/// Launcher that replays a fixed script, one [`Attempt`] per launch.
pub struct ScriptedLauncher {
    script: Mutex<VecDeque<Attempt>>,
    pub probe: Arc<Probe>,
}

impl ScriptedLauncher {
    pub fn new(script: impl IntoIterator<Item = Attempt>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            probe: Arc::new(Probe::default()),
        }
    }
}

#[async_trait]
impl EngineLauncher for ScriptedLauncher {
    async fn launch(
        &self,
        command: &EngineCommand,
        working_dir: &Path,
    ) -> io::Result<Box<dyn EngineProcess>> {
        self.probe.launches.fetch_add(1, Ordering::SeqCst);
        self.probe
            .commands
            .lock()
            .unwrap()
            .push(command.tokens().to_vec());
        self.probe
            .working_dirs
            .lock()
            .unwrap()
            .push(working_dir.to_path_buf());

        let next = self.script.lock().unwrap().pop_front();
        let (lines, end) = match next {
            None | Some(Attempt::FailToStart) => {
                return Err(io::Error::new(io::ErrorKind::NotFound, "spawn failed"))
            }
            Some(Attempt::Lines(l)) => (l, End::Eof),
            Some(Attempt::LinesThenError(l)) => (l, End::Error),
            Some(Attempt::LinesThenHang(l)) => (l, End::Hang),
        };
        Ok(Box::new(ScriptedProcess {
            lines: lines.into(),
            end,
            probe: Arc::clone(&self.probe),
        }))
    }
}

enum End {
    Eof,
    Error,
    Hang,
}

struct ScriptedProcess {
    lines: VecDeque<Vec<u8>>,
    end: End,
    probe: Arc<Probe>,
}

#[async_trait]
impl EngineProcess for ScriptedProcess {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        if let Some(line) = self.lines.pop_front() {
            self.probe.reads.fetch_add(1, Ordering::SeqCst);
            return Ok(Some(line));
        }
        match self.end {
            End::Eof => Ok(None),
            End::Error => Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")),
            End::Hang => std::future::pending().await,
        }
    }

    async fn terminate(&mut self) -> io::Result<()> {
        self.probe.terminated.store(true, Ordering::SeqCst);
        self.probe
            .terminated_during_launch
            .lock()
            .unwrap()
            .push(self.probe.launches.load(Ordering::SeqCst));
        Ok(())
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        Ok(Some(0))
    }
}

/// Records every callback; optionally cancels after N console lines.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<FeedbackEvent>,
    pub cancel_after_lines: Option<usize>,
    console_lines: usize,
}

impl RecordingSink {
    pub fn cancelling_after(lines: usize) -> Self {
        Self {
            cancel_after_lines: Some(lines),
            ..Self::default()
        }
    }

    pub fn console_lines(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FeedbackEvent::ConsoleLine(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FeedbackEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

impl FeedbackSink for RecordingSink {
    fn on_info(&mut self, text: &str) {
        self.events.push(FeedbackEvent::Info(text.to_string()));
    }

    fn on_command_echo(&mut self, command: &str) {
        self.events.push(FeedbackEvent::CommandEcho(command.to_string()));
    }

    fn on_console_line(&mut self, line: &str) {
        self.console_lines += 1;
        self.events.push(FeedbackEvent::ConsoleLine(line.to_string()));
    }

    fn on_progress(&mut self, percent: u8) {
        self.events.push(FeedbackEvent::Progress(percent));
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_after_lines
            .is_some_and(|limit| self.console_lines >= limit)
    }
}
