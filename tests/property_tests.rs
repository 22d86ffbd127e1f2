//! Property-based tests for the relay state machine's temporal gates.
//!
//! A shadow model is rebuilt purely from *observed* transitions and events,
//! never from the controller's internals, and checks after every step that:
//!
//! * no off→on transition ever happens within the minimum off-time of the
//!   previously observed off transition (boot counts as an off transition);
//! * the relay is never on while a previously observed fault's lockout is
//!   still running;
//! * a fault arriving while the relay is on de-energises it in that step.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;

use pumpguard::config::ControlTiming;
use pumpguard::fault::FaultCode;
use pumpguard::relay::{ControlIntent, CycleInputs, RelayController, RelayEvent};
use pumpguard::telemetry::fallback_sample;

const MIN_OFF_MS: u64 = 15_000;
const LOCKOUT_MS: u64 = 120_000;

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Stop,
    Schedule(bool),
    Fault(FaultCode),
    Intent {
        on: bool,
        off: bool,
        clear: bool,
    },
    Idle,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Stop),
        any::<bool>().prop_map(Op::Schedule),
        prop_oneof![
            Just(FaultCode::DryRun),
            Just(FaultCode::Overload),
            Just(FaultCode::Undervoltage),
            Just(FaultCode::Overvoltage),
        ]
        .prop_map(Op::Fault),
        (any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(on, off, clear)| Op::Intent { on, off, clear }),
        Just(Op::Idle),
    ]
}

proptest! {
    #[test]
    fn relay_honours_temporal_gates(
        ops in prop::collection::vec((op_strategy(), 100u64..20_000), 1..120),
    ) {
        let timing = ControlTiming {
            min_off_ms: MIN_OFF_MS,
            fault_lockout_ms: LOCKOUT_MS,
            ..Default::default()
        };
        let mut rc = RelayController::new(&timing);

        // Shadow model, fed only by what an outside observer sees.
        let mut now_ms: u64 = 0;
        let mut schedule_on = false;
        let mut was_on = false;
        let mut last_off_ms: u64 = 0; // boot counts as an off transition
        let mut lockout_until_ms: u64 = 0;

        for (op, delta_ms) in ops {
            now_ms += delta_ms;

            let mut inp = CycleInputs {
                now_ms,
                fault: FaultCode::None,
                sample: fallback_sample(0),
                schedule_on,
                start_pressed: false,
                stop_pressed: false,
                intent: None,
            };
            match op {
                Op::Start => inp.start_pressed = true,
                Op::Stop => inp.stop_pressed = true,
                Op::Schedule(on) => {
                    schedule_on = on;
                    inp.schedule_on = on;
                }
                Op::Fault(code) => inp.fault = code,
                Op::Intent { on, off, clear } => {
                    inp.intent = Some(ControlIntent {
                        force_on: on,
                        force_off: off,
                        clear_manual_override: clear,
                    });
                }
                Op::Idle => {}
            }

            let events = rc.step(&inp);
            let is_on = rc.physical();

            if let Op::Fault(code) = op {
                if code.is_fault() && was_on {
                    prop_assert!(!is_on, "fault at t={now_ms} left the relay on");
                }
            }

            if !was_on && is_on {
                prop_assert!(
                    now_ms.saturating_sub(last_off_ms) >= MIN_OFF_MS,
                    "energised at t={now_ms}, only {}ms after the off at t={last_off_ms}",
                    now_ms - last_off_ms,
                );
                prop_assert!(
                    now_ms >= lockout_until_ms,
                    "energised at t={now_ms} inside the lockout until t={lockout_until_ms}",
                );
            }
            if was_on && !is_on {
                last_off_ms = now_ms;
            }
            if events
                .iter()
                .any(|e| matches!(e, RelayEvent::FaultTripped { .. }))
            {
                lockout_until_ms = now_ms + LOCKOUT_MS;
            }

            was_on = is_on;
        }
    }

    #[test]
    fn stop_always_wins_regardless_of_other_inputs(
        start in any::<bool>(),
        schedule_on in any::<bool>(),
        force_on in any::<bool>(),
        now_ms in 20_000u64..1_000_000,
    ) {
        let timing = ControlTiming {
            min_off_ms: MIN_OFF_MS,
            fault_lockout_ms: LOCKOUT_MS,
            ..Default::default()
        };
        let mut rc = RelayController::new(&timing);

        let inp = CycleInputs {
            now_ms,
            fault: FaultCode::None,
            sample: fallback_sample(0),
            schedule_on,
            start_pressed: start,
            stop_pressed: true,
            intent: Some(ControlIntent {
                force_on,
                force_off: false,
                clear_manual_override: false,
            }),
        };
        let _ = rc.step(&inp);
        prop_assert!(!rc.physical());

        // And the stop latches: the schedule alone cannot restart it.
        let later = CycleInputs {
            now_ms: now_ms + MIN_OFF_MS + 1_000,
            fault: FaultCode::None,
            sample: fallback_sample(0),
            schedule_on: true,
            start_pressed: false,
            stop_pressed: false,
            intent: None,
        };
        let _ = rc.step(&later);
        prop_assert!(!rc.physical());
    }
}
