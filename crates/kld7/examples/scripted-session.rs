//! Run a full session against a scripted link, no hardware needed.
//!
//! Run with:
//!   cargo run --example scripted-session
//!
//! The script acknowledges setup, refuses the range preset, then serves a few
//! detection cycles before the goodbye.

use std::time::Duration;

use kld7::session::{run_session, Cancellation, PollOutcome, SessionConfig};
use kld7::transport::{LinkEvent, MockLink};

const ACK_OK: [u8; 9] = [b'R', b'E', b'S', b'P', 1, 0, 0, 0, 0];
const ACK_INVALID: [u8; 9] = [b'R', b'E', b'S', b'P', 1, 0, 0, 0, 2];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let link = MockLink::new();
    link.push_reply(&ACK_OK)
        .push_reply(&ACK_OK)
        .push_reply(&ACK_INVALID);

    // Target walking toward the sensor, slightly off axis.
    for step in 0u16..5 {
        let distance = 300 - step * 40;
        let mut payload = Vec::with_capacity(8);
        payload.extend_from_slice(&distance.to_le_bytes());
        payload.extend_from_slice(&(-120i16).to_le_bytes());
        payload.extend_from_slice(&(250i16).to_le_bytes());
        payload.extend_from_slice(&(40u16 + step).to_le_bytes());

        link.push_reply(&ACK_OK)
            .push_reply(b"TDAT\x08\x00\x00\x00")
            .push_reply(&payload);
    }
    link.push_reply(&ACK_OK).push_reply(b"TDAT\x00\x00\x00\x00");
    link.push_reply(&ACK_OK);

    let config = SessionConfig {
        settle_delay: Duration::ZERO,
        max_cycles: Some(6),
        ..SessionConfig::default()
    };

    let report = run_session(link.clone(), config, &Cancellation::new(), |outcome| {
        match outcome {
            PollOutcome::Target(capture) => eprintln!(
                "target: {:.0} cm, {:+.2} km/h, {:.2} deg",
                capture.target.distance_cm, capture.target.speed_kmh, capture.target.angle_deg
            ),
            PollOutcome::NoTarget => eprintln!("no target"),
            PollOutcome::Missed(reason) => eprintln!("missed cycle: {reason}"),
        }
    });
    report.outcome?;

    eprintln!(
        "{} captures, final state {}, link closed: {}",
        report.captures.len(),
        report.final_state,
        link.is_closed()
    );
    for event in link.events() {
        if let LinkEvent::Write(bytes) = event {
            eprintln!("sent {}", String::from_utf8_lossy(&bytes[..4]));
        }
    }

    Ok(())
}
