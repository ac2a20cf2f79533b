#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{Error, ErrorKind};
use std::rc::Rc;

/// Register-backed model of one sensor.
pub struct SimDevice {
    /// Written values, keyed by the two letters shared by the read and write
    /// command (`BR` for RBR/WBR).
    registers: HashMap<[u8; 2], i64>,
    /// Raw position, before the offset is applied.
    pub position: i32,
    pub sampling_cycle: u8,
    pub shutter_time: u8,
    pub alarm: bool,
    status: u8,
    buffer: Vec<i32>,
    /// Answer the next command with this error code.
    pub fail_next: Option<[u8; 2]>,
}

impl SimDevice {
    pub fn new(position: i32) -> Self {
        SimDevice {
            registers: HashMap::new(),
            position,
            sampling_cycle: 2,
            shutter_time: 0,
            alarm: false,
            status: 0,
            buffer: Vec::new(),
            fail_next: None,
        }
    }

    pub fn register(&self, key: &[u8; 2]) -> i64 {
        self.registers.get(key).copied().unwrap_or(0)
    }

    pub fn set_register(&mut self, key: [u8; 2], value: i64) {
        self.registers.insert(key, value);
    }

    fn measurement(&self) -> i64 {
        i64::from(self.position) + self.register(b"ML")
    }

    fn buffering_started(&self) -> bool {
        self.register(b"BS") == 1
    }

    /// Handle one frame body (command code + payload). Returns the reply
    /// after the `%NN` header, without trailer.
    fn handle(&mut self, cmd: &[u8; 3], payload: &[u8]) -> Result<Vec<u8>, [u8; 2]> {
        if let Some(code) = self.fail_next.take() {
            return Err(code);
        }
        let key = [cmd[1], cmd[2]];
        let mut reply = b"$".to_vec();
        reply.extend_from_slice(cmd);
        match cmd[0] {
            b'R' => {
                let field = match cmd {
                    b"RSP" => unsigned(self.sampling_cycle.into()),
                    b"RFB" => unsigned(self.shutter_time.into()),
                    b"RMD" => signed(self.measurement()),
                    b"RBL" | b"RML" => signed(self.register(&key)),
                    b"RTS" => unsigned(self.status.into()),
                    b"RLD" => unsigned(self.buffer.len() as i64),
                    b"ROA" => unsigned(self.alarm.into()),
                    b"RMB" => unsigned(i64::from(self.alarm) | self.register(b"TI") << 1),
                    b"RLA" => self.bulk(payload)?,
                    b"RBD" | b"RBS" | b"RBR" | b"RZS" | b"RBC" | b"RTP" | b"RTL" | b"RTR"
                    | b"RAD" | b"RHC" | b"RTM" | b"RTI" => unsigned(self.register(&key)),
                    _ => return Err(*b"01"),
                };
                if !payload.is_empty() && cmd != b"RLA" {
                    return Err(*b"03");
                }
                reply.extend_from_slice(&field);
            }
            b'W' => {
                let value = self.write_value(cmd, payload)?;
                self.write(cmd, key, value)?;
            }
            _ => return Err(*b"01"),
        }
        Ok(reply)
    }

    fn write_value(&self, cmd: &[u8; 3], payload: &[u8]) -> Result<i64, [u8; 2]> {
        let digits = if cmd == b"WBL" || cmd == b"WML" { 7 } else { 5 };
        if payload.len() != digits + 1 {
            return Err(*b"03");
        }
        let text = std::str::from_utf8(payload).map_err(|_| *b"03")?;
        let value: i64 = text.parse().map_err(|_| *b"03")?;
        if digits == 5 && payload[0] != b'+' {
            return Err(*b"03");
        }
        Ok(value)
    }

    fn write(&mut self, cmd: &[u8; 3], key: [u8; 2], value: i64) -> Result<(), [u8; 2]> {
        match cmd {
            b"WBR" | b"WBD" | b"WBC" | b"WTP" | b"WTL" | b"WTR" if self.buffering_started() => {
                return Err(*b"22")
            }
            b"WBS" => {
                self.status = if value == 1 && self.register(b"BD") == 1 {
                    1
                } else {
                    0
                };
                if value == 1 {
                    self.buffer.clear();
                }
            }
            b"WTI" if value == 1 && self.status == 1 => {
                // accumulation finishes instantly
                let amount = self.register(b"BC").max(0) as i32;
                let m = self.measurement() as i32;
                self.buffer = (0..amount).map(|i| m + i - amount / 2).collect();
                self.status = 3;
            }
            b"WBD" | b"WBR" | b"WZS" | b"WBC" | b"WTP" | b"WTL" | b"WTR" | b"WBL" | b"WML"
            | b"WAD" | b"WHC" | b"WTM" | b"WTI" => {}
            _ => return Err(*b"01"),
        }
        self.set_register(key, value);
        Ok(())
    }

    fn bulk(&self, payload: &[u8]) -> Result<Vec<u8>, [u8; 2]> {
        if self.status != 3 {
            return Err(*b"31");
        }
        let text = std::str::from_utf8(payload).map_err(|_| *b"03")?;
        if text.len() != 10 {
            return Err(*b"03");
        }
        let start: usize = text[..5].parse().map_err(|_| *b"03")?;
        let end: usize = text[5..].parse().map_err(|_| *b"03")?;
        if start == 0 || start > end || end > self.buffer.len() {
            return Err(*b"03");
        }
        let mut out = String::new();
        for (i, v) in self.buffer[start - 1..end].iter().enumerate() {
            // separators vary: a space, or nothing in front of a sign
            match (i % 2, v.is_negative()) {
                (_, true) => out.push_str(&format!("-{:08}", v.unsigned_abs())),
                (0, false) => out.push_str(&format!("+{:08}", v)),
                (_, false) => out.push_str(&format!(" {:08}", v)),
            }
        }
        Ok(out.into_bytes())
    }
}

fn unsigned(v: i64) -> Vec<u8> {
    format!("+{:05}", v).into_bytes()
}

fn signed(v: i64) -> Vec<u8> {
    format!("{}{:07}", if v < 0 { '-' } else { '+' }, v.abs()).into_bytes()
}

/// Serial line with sensors attached to it.
pub struct SerialInterface {
    devices: HashMap<u8, SimDevice>,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    /// Every complete frame written to the line.
    pub frames: Vec<Vec<u8>>,
    /// Keep the next reply back until another frame is written, so it shows
    /// up after the controller stopped waiting for it.
    pub delay_next_reply: bool,
    delayed: Vec<u8>,
    do_read_error: bool,
    do_write_error: bool,
}

pub struct SerialIOPlane(Rc<RefCell<SerialInterface>>);

impl SerialIOPlane {
    pub fn new(serial_if: &Rc<RefCell<SerialInterface>>) -> SerialIOPlane {
        SerialIOPlane(serial_if.clone())
    }
}

impl SerialInterface {
    pub fn new() -> Rc<RefCell<SerialInterface>> {
        Rc::new(RefCell::new(SerialInterface {
            devices: HashMap::new(),
            rx: VecDeque::new(),
            tx: Vec::new(),
            frames: Vec::new(),
            delay_next_reply: false,
            delayed: Vec::new(),
            do_read_error: false,
            do_write_error: false,
        }))
    }

    /// A line with a single sensor at `id`.
    pub fn with_device(id: u8, device: SimDevice) -> Rc<RefCell<SerialInterface>> {
        let serial = Self::new();
        serial.borrow_mut().attach(id, device);
        serial
    }

    pub fn attach(&mut self, id: u8, device: SimDevice) {
        self.devices.insert(id, device);
    }

    pub fn device(&mut self, id: u8) -> &mut SimDevice {
        self.devices.get_mut(&id).expect("no such device")
    }

    pub fn trigger_write_error(&mut self) {
        self.do_write_error = true;
    }

    pub fn trigger_read_error(&mut self) {
        self.do_read_error = true;
    }

    /// Put raw bytes on the line, as if a device had sent them.
    pub fn inject(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }

    /// Bytes waiting to be read by the controller.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    fn process_frames(&mut self) {
        while let Some(pos) = self.tx.iter().position(|b| *b == b'\r') {
            let frame: Vec<u8> = self.tx.drain(..=pos).collect();
            self.frames.push(frame.clone());
            let late = std::mem::take(&mut self.delayed);
            self.rx.extend(late);
            self.answer(&frame);
        }
    }

    fn answer(&mut self, frame: &[u8]) {
        // %NN#CCC[payload]**\r
        if frame.len() < 10 || frame[0] != b'%' || frame[3] != b'#' {
            return;
        }
        let id = match std::str::from_utf8(&frame[1..3]).ok().and_then(|s| s.parse().ok()) {
            Some(id) => id,
            None => return,
        };
        let device = match self.devices.get_mut(&id) {
            Some(device) => device,
            None => return, // nobody answers
        };
        let mut reply = frame[..3].to_vec();
        if !frame.ends_with(b"**\r") {
            reply.extend_from_slice(b"!04");
        } else {
            let cmd = [frame[4], frame[5], frame[6]];
            match device.handle(&cmd, &frame[7..frame.len() - 3]) {
                Ok(body) => reply.extend_from_slice(&body),
                Err(code) => {
                    reply.push(b'!');
                    reply.extend_from_slice(&code);
                }
            }
        }
        reply.extend_from_slice(b"**\r");
        if self.delay_next_reply {
            self.delay_next_reply = false;
            self.delayed = reply;
        } else {
            self.rx.extend(reply);
        }
    }
}

impl std::io::Read for SerialIOPlane {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        if inner.do_read_error {
            inner.do_read_error = false;
            return Err(Error::new(ErrorKind::BrokenPipe, "read error"));
        }
        let mut len = 0;
        while len < buf.len() {
            match inner.rx.pop_front() {
                Some(byte) => {
                    buf[len] = byte;
                    len += 1;
                }
                None => break,
            }
        }
        if len == 0 {
            // what a serial port does when its read timeout elapses
            Err(Error::new(ErrorKind::TimedOut, "no data"))
        } else {
            Ok(len)
        }
    }
}

impl std::io::Write for SerialIOPlane {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        if inner.do_write_error {
            inner.do_write_error = false;
            Err(Error::new(ErrorKind::PermissionDenied, "write error"))
        } else {
            inner.tx.extend_from_slice(buf);
            inner.process_frames();
            Ok(buf.len())
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
