//! Scripted surface input for `deckhand simulate`.
//!
//! One command per line, `#` starts a comment:
//!
//! ```text
//! press play          # button down
//! release play        # button up
//! tap volume          # down and up
//! hold device 600     # down, wait 600 ms, up
//! pad 12 100          # pad hit (velocity 0 releases)
//! knob 0 3            # raw knob value
//! touch 0 on          # knob touch / release
//! bend 12000          # pitch bend, 14 bit
//! wait 250            # advance the clock
//! ```
//!
//! Buttons are named in lower case; row and scene buttons take an index:
//! `row1:3`, `row2:0`, `scene:7`.

use anyhow::{bail, Context, Result};
use deckhand_core::{ButtonId, ControlEvent};
use std::time::Duration;

/// One scripted step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Event(ControlEvent),
    Wait(Duration),
}

/// Built-in script used when no file is given
pub const DEMO_SCRIPT: &str = r#"# walk through modes, views and a few knobs
wait 100
tap pan
knob 0 3
wait 400
hold device 600
tap session
pad 56 100
pad 56 0
tap note
pad 9 90
wait 120
pad 9 0
press shift
tap play
release shift
tap play
tap track
press row1:2
release row1:2
wait 500
"#;

pub fn parse(script: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (number, line) in script.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        parse_line(line, &mut steps).with_context(|| format!("line {}: '{}'", number + 1, line))?;
    }
    Ok(steps)
}

fn parse_line(line: &str, steps: &mut Vec<Step>) -> Result<()> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let arg = |i: usize| argument(&words, i);

    match words[0] {
        "press" | "release" => {
            let id = button(arg(1)?)?;
            steps.push(button_event(id, words[0] == "press"));
        }
        "tap" => {
            let id = button(arg(1)?)?;
            steps.push(button_event(id, true));
            steps.push(button_event(id, false));
        }
        "hold" => {
            let id = button(arg(1)?)?;
            let ms: u64 = arg(2)?.parse()?;
            steps.push(button_event(id, true));
            steps.push(Step::Wait(Duration::from_millis(ms)));
            steps.push(button_event(id, false));
        }
        "pad" => steps.push(Step::Event(ControlEvent::Pad {
            index: arg(1)?.parse()?,
            velocity: arg(2)?.parse()?,
        })),
        "knob" => steps.push(Step::Event(ControlEvent::Knob {
            index: arg(1)?.parse()?,
            raw: arg(2)?.parse()?,
        })),
        "touch" => {
            let touched = match arg(2)? {
                "on" => true,
                "off" => false,
                other => bail!("expected on/off, got '{}'", other),
            };
            steps.push(Step::Event(ControlEvent::KnobTouch {
                index: arg(1)?.parse()?,
                touched,
            }));
        }
        "bend" => steps.push(Step::Event(ControlEvent::PitchBend {
            value: arg(1)?.parse::<u16>()?.min(16383),
        })),
        "wait" => steps.push(Step::Wait(Duration::from_millis(arg(1)?.parse()?))),
        other => bail!("unknown command '{}'", other),
    }
    Ok(())
}

fn argument<'a>(words: &[&'a str], i: usize) -> Result<&'a str> {
    words
        .get(i)
        .copied()
        .with_context(|| format!("missing argument {}", i))
}

fn button_event(id: ButtonId, pressed: bool) -> Step {
    Step::Event(ControlEvent::Button {
        id,
        pressed,
        velocity: if pressed { 127 } else { 0 },
    })
}

/// Parse a button name such as `play` or `scene:3`
pub fn button(name: &str) -> Result<ButtonId> {
    if let Some((row, index)) = name.split_once(':') {
        let index: u8 = index.parse().with_context(|| format!("bad index in '{}'", name))?;
        return match row {
            "row1" => Ok(ButtonId::Row1(index)),
            "row2" => Ok(ButtonId::Row2(index)),
            "scene" => Ok(ButtonId::Scene(index)),
            _ => bail!("unknown button row '{}'", row),
        };
    }
    let id = match name {
        "shift" => ButtonId::Shift,
        "select" => ButtonId::Select,
        "play" => ButtonId::Play,
        "record" => ButtonId::Record,
        "stop" => ButtonId::Stop,
        "up" => ButtonId::Up,
        "down" => ButtonId::Down,
        "left" => ButtonId::Left,
        "right" => ButtonId::Right,
        "octave_up" => ButtonId::OctaveUp,
        "octave_down" => ButtonId::OctaveDown,
        "volume" => ButtonId::Volume,
        "pan" => ButtonId::Pan,
        "sends" => ButtonId::Sends,
        "track" => ButtonId::Track,
        "device" => ButtonId::Device,
        "transport" => ButtonId::Transport,
        "scale" => ButtonId::ScaleSettings,
        "session" => ButtonId::Session,
        "note" => ButtonId::Note,
        "drum" => ButtonId::Drum,
        "sequencer" => ButtonId::Sequencer,
        "step_edit" => ButtonId::StepEdit,
        _ => bail!("unknown button '{}'", name),
    };
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_demo_script() {
        let steps = parse(DEMO_SCRIPT).unwrap();
        assert_eq!(steps[0], Step::Wait(Duration::from_millis(100)));
        assert_eq!(steps[1], button_event(ButtonId::Pan, true));
        assert_eq!(steps[2], button_event(ButtonId::Pan, false));
    }

    #[test]
    fn test_hold_expands_to_wait() {
        let steps = parse("hold device 600 # peek").unwrap();
        assert_eq!(
            steps,
            vec![
                button_event(ButtonId::Device, true),
                Step::Wait(Duration::from_millis(600)),
                button_event(ButtonId::Device, false),
            ]
        );
    }

    #[test]
    fn test_indexed_buttons() {
        assert_eq!(button("scene:7").unwrap(), ButtonId::Scene(7));
        assert_eq!(button("row2:0").unwrap(), ButtonId::Row2(0));
        assert!(button("row3:0").is_err());
        assert!(button("jump").is_err());
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = parse("tap play\nknob x 1\n").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
