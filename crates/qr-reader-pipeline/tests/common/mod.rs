#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use qr_reader_engine::{
    CodeMatrix, DecodeEngine, DecodeFailure, EccLevel, EngineError, EngineFactory, SymbolData,
};
use qr_reader_pipeline::{
    CameraConfig, CameraDriver, CameraInitError, DataType, FrameBuffer, FrameSource,
};

/// First-pixel markers understood by [`ScriptedEngine`].
pub const BLANK: u8 = 255;
pub const HELLO: u8 = 10;
pub const CORRUPT: u8 = 20;
pub const THREE_SYMBOLS: u8 = 30;

pub type Candidate = Result<SymbolData, DecodeFailure>;

pub fn text(data_type: DataType, payload: &str) -> Candidate {
    Ok(SymbolData {
        data_type,
        payload: payload.as_bytes().to_vec(),
        version: 1,
        ecc_level: EccLevel::M,
        mask: 2,
    })
}

/// Frames keyed by their first pixel.
pub fn default_script() -> HashMap<u8, Vec<Candidate>> {
    HashMap::from([
        (HELLO, vec![text(DataType::Alphanumeric, "HELLO")]),
        (CORRUPT, vec![Err(DecodeFailure::DataEcc)]),
        (
            THREE_SYMBOLS,
            vec![
                text(DataType::Numeric, "1"),
                text(DataType::Numeric, "2"),
                text(DataType::Numeric, "3"),
            ],
        ),
    ])
}

/// Decode engine that "finds" whatever the script lists for the frame's
/// first pixel.
pub struct ScriptedEngine {
    script: Arc<HashMap<u8, Vec<Candidate>>>,
    resizes: Arc<AtomicUsize>,
    image: Vec<u8>,
    located: Vec<Candidate>,
}

impl DecodeEngine for ScriptedEngine {
    fn resize(&mut self, width: u16, height: u16) -> Result<(), EngineError> {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        self.image = vec![0; width as usize * height as usize];
        Ok(())
    }

    fn image_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    fn identify(&mut self) {
        let marker = self.image.first().copied().unwrap_or(BLANK);
        self.located = self.script.get(&marker).cloned().unwrap_or_default();
    }

    fn count(&self) -> usize {
        self.located.len()
    }

    fn extract(&self, index: usize) -> Option<CodeMatrix> {
        let mut code = CodeMatrix::blank(21);
        code.corners[0] = (index as i32, 0);
        (index < self.located.len()).then_some(code)
    }

    fn decode(&self, code: &CodeMatrix) -> Result<SymbolData, DecodeFailure> {
        self.located[code.corners[0].0 as usize].clone()
    }
}

/// Factory for [`ScriptedEngine`] plus its resize counter.
pub fn scripted_engine() -> (EngineFactory, Arc<AtomicUsize>) {
    let script = Arc::new(default_script());
    let resizes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&resizes);
    let factory: EngineFactory = Box::new(move || {
        Ok(Box::new(ScriptedEngine {
            script: Arc::clone(&script),
            resizes: Arc::clone(&counter),
            image: Vec::new(),
            located: Vec::new(),
        }) as Box<dyn DecodeEngine>)
    });
    (factory, resizes)
}

/// A 16x16 frame tagged with `marker`.
pub fn frame(marker: u8) -> FrameBuffer {
    let mut data = vec![BLANK; 16 * 16];
    data[0] = marker;
    FrameBuffer::new(16, 16, data)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Acquired(u64),
    Observed(u64),
    Released(u64),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn events(log: &EventLog) -> Vec<Event> {
    log.lock().expect("event log").clone()
}

/// Yields the queued frames once, then nothing.
pub struct ScriptedSource {
    frames: VecDeque<FrameBuffer>,
    next_sequence: u64,
    log: EventLog,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = FrameBuffer>) -> (Self, EventLog) {
        let log = EventLog::default();
        let source = Self {
            frames: frames.into_iter().collect(),
            next_sequence: 1,
            log: Arc::clone(&log),
        };
        (source, log)
    }
}

impl FrameSource for ScriptedSource {
    fn acquire(&mut self) -> Option<FrameBuffer> {
        let frame = self.frames.pop_front()?.with_sequence(self.next_sequence);
        self.next_sequence += 1;
        self.log
            .lock()
            .expect("event log")
            .push(Event::Acquired(frame.sequence));
        Some(frame)
    }

    fn release(&mut self, frame: FrameBuffer) {
        self.log
            .lock()
            .expect("event log")
            .push(Event::Released(frame.sequence));
    }
}

/// Camera driver double recording the configuration it was given.
#[derive(Default)]
pub struct MockCamera {
    pub no_external_memory: bool,
    pub init_error: Option<String>,
    pub frames: Vec<FrameBuffer>,
    pub applied: Option<CameraConfig>,
    pub log: EventLog,
}

impl CameraDriver for MockCamera {
    fn external_memory_available(&self) -> bool {
        !self.no_external_memory
    }

    fn init(&mut self, config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraInitError> {
        if let Some(reason) = &self.init_error {
            return Err(CameraInitError(reason.clone()));
        }
        self.applied = Some(config.clone());
        let (mut source, _) = ScriptedSource::new(std::mem::take(&mut self.frames));
        source.log = Arc::clone(&self.log);
        Ok(Box::new(source))
    }
}
