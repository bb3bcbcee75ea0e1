//! OSC emitter: fire-and-forget UDP delivery of triggers on a sender thread.
//!
//! `emit` only encodes and queues; the socket lives on its own thread so a
//! slow or unreachable synth never stalls the tick. Send failures are logged
//! and dropped.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use rosc::{encoder, OscMessage, OscPacket, OscType};

use super::{InstrumentTrigger, SamplerTrigger, Trigger, TriggerSink};
use crate::error::Error;

pub const INSTRUMENT_ADDR: &str = "/gridtrack/instrument";
pub const SAMPLER_ADDR: &str = "/gridtrack/sampler";

fn opt_int(value: Option<u8>) -> OscType {
    OscType::Int(value.map_or(-1, i32::from))
}

fn track_int(track: usize) -> OscType {
    OscType::Int(i32::try_from(track).unwrap_or(i32::MAX))
}

/// One message per sounding note.
pub fn instrument_messages(t: &InstrumentTrigger) -> Vec<OscMessage> {
    t.notes
        .iter()
        .map(|&note| OscMessage {
            addr: INSTRUMENT_ADDR.to_string(),
            args: vec![
                track_int(t.track),
                OscType::Int(i32::from(note)),
                OscType::Float(t.velocity),
                opt_int(t.envelope.attack),
                opt_int(t.envelope.decay),
                opt_int(t.envelope.sustain),
                opt_int(t.envelope.release),
                opt_int(t.midi),
                opt_int(t.soundmaker),
            ],
        })
        .collect()
}

pub fn sampler_message(t: &SamplerTrigger) -> OscMessage {
    let mut args = vec![
        track_int(t.track),
        OscType::String(t.path.to_string_lossy().into_owned()),
        OscType::Int(i32::from(t.slice)),
        OscType::Int(i32::from(t.slices)),
        OscType::Float(t.source_bpm),
        OscType::Float(t.target_bpm),
        OscType::Float(t.pitch),
        OscType::Float(t.gate),
        OscType::Float(t.pan),
        OscType::Float(t.lowpass_hz),
        OscType::Float(t.highpass_hz),
        OscType::Float(t.comb),
        OscType::Float(t.reverb),
        OscType::Float(t.ducking.map_or(0.0, |d| d.depth)),
        OscType::Int(i32::from(t.reverse)),
    ];
    match &t.retrigger {
        Some(hit) => args.extend([
            OscType::Float(hit.rate),
            OscType::Float(hit.pitch),
            OscType::Float(hit.volume_db),
            OscType::Int(i32::from(hit.index)),
            OscType::Int(i32::from(hit.times)),
        ]),
        None => args.extend([
            OscType::Float(0.0),
            OscType::Float(0.0),
            OscType::Float(0.0),
            OscType::Int(-1),
            OscType::Int(0),
        ]),
    }
    match &t.stretch {
        Some(s) => args.extend([
            OscType::Float(s.ratio),
            OscType::Float(s.end_ratio),
            OscType::Float(s.seconds),
        ]),
        None => args.extend([
            OscType::Float(0.0),
            OscType::Float(0.0),
            OscType::Float(0.0),
        ]),
    }
    OscMessage {
        addr: SAMPLER_ADDR.to_string(),
        args,
    }
}

/// Encode a trigger as one or more OSC packets.
pub fn encode_trigger(trigger: &Trigger) -> Result<Vec<Vec<u8>>, Error> {
    let messages = match trigger {
        Trigger::Instrument(t) => instrument_messages(t),
        Trigger::Sampler(t) => vec![sampler_message(t)],
    };
    messages
        .into_iter()
        .map(|msg| Ok(encoder::encode(&OscPacket::Message(msg))?))
        .collect()
}

/// Sends triggers to a synth over UDP.
pub struct OscEmitter {
    sender: Option<Sender<Vec<u8>>>,
    thread: Option<JoinHandle<()>>,
    target: SocketAddr,
}

impl OscEmitter {
    /// Resolve `host:port` and start the sender thread.
    pub fn connect(host: &str, port: u16) -> Result<Self, Error> {
        let target = (host, port)
            .to_socket_addrs()
            .map_err(|_| Error::Address(format!("{host}:{port}")))?
            .next()
            .ok_or_else(|| Error::Address(format!("{host}:{port}")))?;
        let bind = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind)?;
        let (tx, rx) = mpsc::channel::<Vec<u8>>();

        let thread = thread::Builder::new()
            .name("gridtrack-osc".to_string())
            .spawn(move || {
                // Ends once every sender is dropped.
                for packet in rx {
                    if let Err(e) = socket.send_to(&packet, target) {
                        warn!("OSC send to {target} failed: {e}");
                    }
                }
            })?;

        debug!("OSC emitter sending to {target}");
        Ok(Self {
            sender: Some(tx),
            thread: Some(thread),
            target,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl TriggerSink for OscEmitter {
    fn emit(&mut self, tick: u64, trigger: Trigger) {
        let packets = match encode_trigger(&trigger) {
            Ok(packets) => packets,
            Err(e) => {
                warn!("tick {tick}: dropping trigger for track {}: {e}", trigger.track());
                return;
            }
        };
        let Some(sender) = &self.sender else {
            return;
        };
        for packet in packets {
            if sender.send(packet).is_err() {
                warn!("OSC sender thread has exited");
                return;
            }
        }
    }
}

impl Drop for OscEmitter {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{RetriggerHit, StretchParams};
    use crate::trigger::Envelope;
    use std::path::PathBuf;
    use std::time::Duration;

    fn instrument() -> InstrumentTrigger {
        InstrumentTrigger {
            track: 2,
            notes: vec![60, 64, 67],
            velocity: 0.5,
            envelope: Envelope {
                attack: Some(10),
                ..Default::default()
            },
            midi: None,
            soundmaker: Some(3),
        }
    }

    fn sampler() -> SamplerTrigger {
        SamplerTrigger {
            track: 4,
            path: PathBuf::from("kit/snare.wav"),
            slice: 1,
            slices: 8,
            source_bpm: 100.0,
            target_bpm: 120.0,
            pitch: 0.0,
            gate: 1.0,
            pan: 0.0,
            lowpass_hz: 20_000.0,
            highpass_hz: 20.0,
            comb: 0.0,
            reverb: 0.0,
            ducking: None,
            reverse: true,
            retrigger: None,
            stretch: None,
        }
    }

    #[test]
    fn chord_becomes_one_message_per_note() {
        let msgs = instrument_messages(&instrument());
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[1].addr, INSTRUMENT_ADDR);
        assert_eq!(msgs[1].args[0], OscType::Int(2));
        assert_eq!(msgs[1].args[1], OscType::Int(64));
        assert_eq!(msgs[1].args[3], OscType::Int(10));
        assert_eq!(msgs[1].args[4], OscType::Int(-1));
        assert_eq!(msgs[1].args[7], OscType::Int(-1));
        assert_eq!(msgs[1].args[8], OscType::Int(3));
    }

    #[test]
    fn sampler_layout_without_effects() {
        let msg = sampler_message(&sampler());
        assert_eq!(msg.addr, SAMPLER_ADDR);
        assert_eq!(msg.args.len(), 15 + 5 + 3);
        assert_eq!(msg.args[1], OscType::String("kit/snare.wav".to_string()));
        assert_eq!(msg.args[14], OscType::Int(1));
        assert_eq!(msg.args[18], OscType::Int(-1));
    }

    #[test]
    fn sampler_layout_with_effects() {
        let mut t = sampler();
        t.retrigger = Some(RetriggerHit {
            index: 2,
            times: 4,
            rate: 1.5,
            pitch: 1.0,
            volume_db: -3.0,
        });
        t.stretch = Some(StretchParams {
            ratio: 0.75,
            end_ratio: 0.5,
            seconds: 2.0,
        });
        let msg = sampler_message(&t);
        assert_eq!(msg.args[15], OscType::Float(1.5));
        assert_eq!(msg.args[18], OscType::Int(2));
        assert_eq!(msg.args[19], OscType::Int(4));
        assert_eq!(msg.args[20], OscType::Float(0.75));
        assert_eq!(msg.args[22], OscType::Float(2.0));
    }

    #[test]
    fn unresolvable_host_is_an_error() {
        let result = OscEmitter::connect("no such host.invalid", 9000);
        assert!(matches!(result, Err(Error::Address(_))));
    }

    #[test]
    fn emits_over_udp() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut emitter = OscEmitter::connect("127.0.0.1", port).unwrap();
        emitter.emit(0, Trigger::Sampler(sampler()));

        let mut buf = [0u8; 4096];
        let (size, _) = receiver.recv_from(&mut buf).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..size]).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, SAMPLER_ADDR);
                assert_eq!(msg.args[0], OscType::Int(4));
            }
            OscPacket::Bundle(_) => panic!("expected a message"),
        }
    }
}
