//! Differential display and LED writer.
//!
//! Views and modes render a complete desired frame on every refresh tick.
//! The writer compares it against what was last transmitted and only emits
//! hardware writes for cells whose value changed. After a device
//! (re)activation the snapshot is invalidated so the next frame goes out in
//! full.

use crate::surface::ButtonId;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Abstract palette shared by views and modes.
///
/// Transports map these indices onto the device's own colour table.
pub mod colors {
    pub const OFF: u8 = 0;
    pub const DARK_GRAY: u8 = 1;
    pub const GRAY: u8 = 2;
    pub const WHITE: u8 = 3;
    pub const RED: u8 = 5;
    pub const ORANGE: u8 = 9;
    pub const YELLOW: u8 = 13;
    pub const LIME: u8 = 17;
    pub const GREEN: u8 = 21;
    pub const CYAN: u8 = 37;
    pub const BLUE: u8 = 45;
    pub const PURPLE: u8 = 53;
    pub const PINK: u8 = 57;
}

/// State of one light: base colour, optional blink colour and blink speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightInfo {
    pub color: u8,
    pub blink_color: u8,
    pub fast: bool,
}

impl LightInfo {
    /// Light switched off
    pub const OFF: LightInfo = LightInfo {
        color: colors::OFF,
        blink_color: colors::OFF,
        fast: false,
    };

    /// Steady colour
    pub const fn solid(color: u8) -> Self {
        Self {
            color,
            blink_color: colors::OFF,
            fast: false,
        }
    }

    /// Colour alternating with `blink_color`
    pub const fn blinking(color: u8, blink_color: u8, fast: bool) -> Self {
        Self {
            color,
            blink_color,
            fast,
        }
    }

    /// Whether the light blinks
    pub fn is_blinking(&self) -> bool {
        self.blink_color != colors::OFF
    }
}

/// Addressable lights of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LightId {
    /// Grid pad
    Pad(usize),
    /// Button LED
    Button(ButtonId),
    /// Knob LED ring (colour = ring value)
    Knob(usize),
}

/// Desired state of every light for one refresh tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightFrame {
    lights: BTreeMap<LightId, LightInfo>,
}

impl LightFrame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a light
    pub fn set(&mut self, id: LightId, light: LightInfo) {
        self.lights.insert(id, light);
    }

    /// Set a light to a steady colour
    pub fn set_color(&mut self, id: LightId, color: u8) {
        self.set(id, LightInfo::solid(color));
    }

    /// Set a pad light
    pub fn set_pad(&mut self, index: usize, light: LightInfo) {
        self.set(LightId::Pad(index), light);
    }

    /// Set a button light to a steady colour
    pub fn set_button(&mut self, id: ButtonId, color: u8) {
        self.set_color(LightId::Button(id), color);
    }

    /// Light state, if the frame covers it
    pub fn get(&self, id: LightId) -> Option<LightInfo> {
        self.lights.get(&id).copied()
    }

    /// Number of lights in the frame
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Whether the frame is empty
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Lights in a stable order
    pub fn iter(&self) -> impl Iterator<Item = (LightId, LightInfo)> + '_ {
        self.lights.iter().map(|(id, light)| (*id, *light))
    }
}

/// Desired display text, organised in fixed-width cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFrame {
    rows: usize,
    cells: usize,
    width: usize,
    text: Vec<String>,
}

impl TextFrame {
    /// Create a blank frame
    pub fn new(rows: usize, cells: usize, width: usize) -> Self {
        Self {
            rows,
            cells,
            width,
            text: vec![String::new(); rows * cells],
        }
    }

    /// Display rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cells per row
    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Characters per cell
    pub fn width(&self) -> usize {
        self.width
    }

    /// Set one cell; text longer than the cell width is cut.
    pub fn set(&mut self, row: usize, cell: usize, text: &str) {
        if row >= self.rows || cell >= self.cells {
            return;
        }
        self.text[row * self.cells + cell] = text.chars().take(self.width).collect();
    }

    /// Spread a line over the cells of a row, clearing the rest of the row.
    pub fn set_line(&mut self, row: usize, text: &str) {
        let chars: Vec<char> = text.chars().collect();
        for cell in 0..self.cells {
            let start = (cell * self.width).min(chars.len());
            let end = ((cell + 1) * self.width).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            self.set(row, cell, &chunk);
        }
    }

    /// Content of a cell
    pub fn cell(&self, row: usize, cell: usize) -> &str {
        if row >= self.rows || cell >= self.cells {
            return "";
        }
        &self.text[row * self.cells + cell]
    }

    /// A whole row with every cell padded to the cell width
    pub fn line(&self, row: usize) -> String {
        (0..self.cells)
            .map(|c| format!("{:<width$}", self.cell(row, c), width = self.width))
            .collect()
    }

    /// Clear every cell
    pub fn clear(&mut self) {
        for cell in &mut self.text {
            cell.clear();
        }
    }

    /// Cells keyed by `(row, cell)` in display order
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &str)> + '_ {
        self.text
            .iter()
            .enumerate()
            .map(|(i, text)| ((i / self.cells, i % self.cells), text.as_str()))
    }
}

/// Snapshot of last transmitted values; yields only what changed.
#[derive(Debug, Clone)]
pub struct DiffBuffer<K, V> {
    sent: HashMap<K, V>,
}

impl<K, V> Default for DiffBuffer<K, V> {
    fn default() -> Self {
        Self {
            sent: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V: PartialEq + Clone> DiffBuffer<K, V> {
    /// Create an empty buffer (everything counts as changed)
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a frame against the snapshot, record it as sent and return
    /// the cells that differ.
    pub fn diff<I>(&mut self, frame: I) -> Vec<(K, V)>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut changed = Vec::new();
        for (key, value) in frame {
            if self.sent.get(&key) == Some(&value) {
                continue;
            }
            self.sent.insert(key.clone(), value.clone());
            changed.push((key, value));
        }
        changed
    }

    /// Last value sent for a cell
    pub fn last_sent(&self, key: &K) -> Option<&V> {
        self.sent.get(key)
    }

    /// Forget the snapshot so the next frame is sent in full.
    pub fn invalidate(&mut self) {
        self.sent.clear();
    }
}

/// Hardware side of the writer.
///
/// Writes are fire-and-forget; implementations log their own failures.
pub trait SurfaceOutput {
    /// Set one light
    fn write_light(&mut self, id: LightId, light: LightInfo);

    /// Set one display cell
    fn write_text(&mut self, row: usize, cell: usize, text: &str);

    /// Called once after all writes of a refresh tick
    fn flush(&mut self) {}
}

/// A single hardware write, as captured by [`RecordingOutput`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareWrite {
    Light(LightId, LightInfo),
    Text { row: usize, cell: usize, text: String },
}

/// Output that records every write (simulation and tests)
#[derive(Debug, Default)]
pub struct RecordingOutput {
    pub writes: Vec<HardwareWrite>,
    pub flushes: usize,
}

impl RecordingOutput {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the recorded writes
    pub fn take(&mut self) -> Vec<HardwareWrite> {
        std::mem::take(&mut self.writes)
    }
}

impl SurfaceOutput for RecordingOutput {
    fn write_light(&mut self, id: LightId, light: LightInfo) {
        self.writes.push(HardwareWrite::Light(id, light));
    }

    fn write_text(&mut self, row: usize, cell: usize, text: &str) {
        self.writes.push(HardwareWrite::Text {
            row,
            cell,
            text: text.to_string(),
        });
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}

impl<T: SurfaceOutput + ?Sized> SurfaceOutput for Box<T> {
    fn write_light(&mut self, id: LightId, light: LightInfo) {
        (**self).write_light(id, light);
    }

    fn write_text(&mut self, row: usize, cell: usize, text: &str) {
        (**self).write_text(row, cell, text);
    }

    fn flush(&mut self) {
        (**self).flush();
    }
}

/// Differential writer for lights and display text.
#[derive(Debug, Default)]
pub struct SurfaceWriter {
    lights: DiffBuffer<LightId, LightInfo>,
    text: DiffBuffer<(usize, usize), String>,
}

impl SurfaceWriter {
    /// Create a writer with an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Send the lights that changed. Returns the number of writes.
    pub fn write_lights(&mut self, frame: &LightFrame, output: &mut dyn SurfaceOutput) -> usize {
        let changed = self.lights.diff(frame.iter());
        for (id, light) in &changed {
            output.write_light(*id, *light);
        }
        changed.len()
    }

    /// Send the display cells that changed. Returns the number of writes.
    pub fn write_text(&mut self, frame: &TextFrame, output: &mut dyn SurfaceOutput) -> usize {
        let changed = self
            .text
            .diff(frame.iter().map(|(key, text)| (key, text.to_string())));
        for ((row, cell), text) in &changed {
            output.write_text(*row, *cell, text);
        }
        changed.len()
    }

    /// Force the next frames to be sent in full.
    pub fn invalidate(&mut self) {
        self.lights.invalidate();
        self.text.invalidate();
    }

    /// Force the next text frame to be sent in full.
    pub fn invalidate_text(&mut self) {
        self.text.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(pads: &[(usize, u8)]) -> LightFrame {
        let mut frame = LightFrame::new();
        for i in 0..16 {
            frame.set_pad(i, LightInfo::OFF);
        }
        for (i, color) in pads {
            frame.set_pad(*i, LightInfo::solid(*color));
        }
        frame
    }

    #[test]
    fn test_same_frame_twice_writes_nothing() {
        let mut writer = SurfaceWriter::new();
        let mut out = RecordingOutput::new();
        let frame = frame_with(&[(3, colors::RED)]);

        assert_eq!(writer.write_lights(&frame, &mut out), 16);
        out.take();
        assert_eq!(writer.write_lights(&frame, &mut out), 0);
        assert!(out.writes.is_empty());
    }

    #[test]
    fn test_one_changed_cell_one_write() {
        let mut writer = SurfaceWriter::new();
        let mut out = RecordingOutput::new();
        writer.write_lights(&frame_with(&[(3, colors::RED)]), &mut out);
        out.take();

        let next = frame_with(&[(3, colors::RED), (7, colors::GREEN)]);
        assert_eq!(writer.write_lights(&next, &mut out), 1);
        assert_eq!(
            out.writes,
            vec![HardwareWrite::Light(LightId::Pad(7), LightInfo::solid(colors::GREEN))]
        );
    }

    #[test]
    fn test_invalidate_resends_everything() {
        let mut writer = SurfaceWriter::new();
        let mut out = RecordingOutput::new();
        let frame = frame_with(&[]);
        writer.write_lights(&frame, &mut out);
        writer.invalidate();
        assert_eq!(writer.write_lights(&frame, &mut out), 16);
    }

    #[test]
    fn test_text_diff_per_cell() {
        let mut writer = SurfaceWriter::new();
        let mut out = RecordingOutput::new();
        let mut text = TextFrame::new(2, 4, 6);
        text.set(0, 0, "Volume");
        assert_eq!(writer.write_text(&text, &mut out), 8);
        out.take();

        text.set(1, 2, "-3.5dB");
        assert_eq!(writer.write_text(&text, &mut out), 1);
        assert_eq!(
            out.writes,
            vec![HardwareWrite::Text {
                row: 1,
                cell: 2,
                text: "-3.5dB".to_string()
            }]
        );
    }

    #[test]
    fn test_text_frame_cells() {
        let mut text = TextFrame::new(1, 3, 4);
        text.set(0, 0, "Overlong");
        assert_eq!(text.cell(0, 0), "Over");
        text.set_line(0, "Please select");
        assert_eq!(text.cell(0, 0), "Plea");
        assert_eq!(text.cell(0, 1), "se s");
        assert_eq!(text.cell(0, 2), "elec");
        assert_eq!(text.line(0), "Please selec");
        text.set(5, 0, "ignored");
        assert_eq!(text.cell(5, 0), "");
    }
}
