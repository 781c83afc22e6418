use super::{format_percent, set_ring, BankNavigable, Mode};
use crate::command::ButtonEvent;
use crate::display::{colors, LightFrame, LightId, TextFrame};
use crate::layer::Layer;
use crate::model::Model;
use crate::session::Parameter;
use crate::surface::ButtonId;
use crate::value::KnobInput;

const NO_DEVICE: &str = "Please select a Device...";

/// Remote controls of the selected device.
///
/// Knobs edit the parameter bank page, the upper row selects a device of
/// the chain and the lower row jumps to a parameter page.
#[derive(Debug, Default)]
pub struct DeviceMode;

impl DeviceMode {
    pub fn new() -> Self {
        Self
    }

    fn parameters(model: &Model) -> Option<&[Parameter]> {
        model
            .selected_device()
            .and_then(|d| model.session.devices.get(d))
            .map(|d| d.parameters.as_slice())
    }
}

impl Layer<Model> for DeviceMode {
    fn on_activate(&mut self, model: &mut Model) {
        if model.selected_device().is_none() {
            if model.session.devices.is_empty() {
                model.notify(NO_DEVICE);
            } else {
                model.device_bank.select(0);
            }
        }
    }
}

impl Mode for DeviceMode {
    fn name(&self) -> String {
        "Device".to_string()
    }

    fn on_knob_value(&mut self, index: usize, input: KnobInput, model: &mut Model) {
        let Some(device) = model.selected_device() else {
            return;
        };
        let Some(parameters) = Self::parameters(model) else {
            return;
        };
        let slot = model.parameter_bank.item(parameters, index);
        let Some(current) = slot.get().map(|p| p.value) else {
            return;
        };
        let position = slot.position();
        model.session.set_parameter(device, position, input.apply(current));
    }

    fn on_row_button(&mut self, row: usize, index: usize, event: ButtonEvent, model: &mut Model) {
        if event != ButtonEvent::Down {
            return;
        }
        if row == 0 {
            model.device_bank.select_item(index);
        } else {
            let page_size = model.parameter_bank.page_size();
            if index * page_size < model.parameter_bank.item_count() {
                model.parameter_bank.scroll_to(index * page_size);
            }
        }
    }

    fn update_display(&self, model: &Model, text: &mut TextFrame) {
        let Some(parameters) = Self::parameters(model) else {
            text.set_line(0, NO_DEVICE);
            return;
        };
        for slot in model.parameter_bank.items(parameters) {
            if let Some(parameter) = slot.get() {
                text.set(0, slot.index(), &parameter.name);
                text.set(1, slot.index(), &format_percent(parameter.value));
            }
        }
    }

    fn update_knob_leds(&self, model: &Model, lights: &mut LightFrame) {
        let parameters = Self::parameters(model).unwrap_or(&[]);
        for slot in model.parameter_bank.items(parameters) {
            set_ring(lights, slot.index(), slot.get().map(|p| p.value));
        }
    }

    fn update_row_buttons(&self, model: &Model, lights: &mut LightFrame) {
        let selected = model.device_bank.selected_index();
        for slot in model.device_bank.items(&model.session.devices) {
            if slot.exists() {
                let color = if selected == Some(slot.index()) {
                    colors::WHITE
                } else {
                    colors::GRAY
                };
                lights.set_color(LightId::Button(ButtonId::Row1(slot.index() as u8)), color);
            }
        }
        let bank = &model.parameter_bank;
        let pages = bank.item_count().div_ceil(bank.page_size());
        let current = bank.page_offset() / bank.page_size();
        for page in 0..pages.min(model.layout().row_buttons) {
            let color = if page == current {
                colors::ORANGE
            } else {
                colors::DARK_GRAY
            };
            lights.set_color(LightId::Button(ButtonId::Row2(page as u8)), color);
        }
    }

    fn as_bank_navigable(&mut self) -> Option<&mut dyn BankNavigable> {
        Some(self)
    }

    fn as_bank_navigable_ref(&self) -> Option<&dyn BankNavigable> {
        Some(self)
    }
}

/// Left/right page the parameters; with shift they step through devices.
impl BankNavigable for DeviceMode {
    fn can_select_previous(&self, model: &Model) -> bool {
        model.parameter_bank.can_scroll_backwards()
    }

    fn can_select_next(&self, model: &Model) -> bool {
        model.parameter_bank.can_scroll_forwards()
    }

    fn select_previous(&mut self, model: &mut Model, page: bool) -> bool {
        if page {
            model.device_bank.select_previous_item()
        } else {
            model.parameter_bank.select_previous_page()
        }
    }

    fn select_next(&mut self, model: &mut Model, page: bool) -> bool {
        if page {
            model.device_bank.select_next_item()
        } else {
            model.parameter_bank.select_next_page()
        }
    }
}
