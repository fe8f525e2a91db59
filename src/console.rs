// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The console state machine. It is the only consumer of controller commands and the only
//! thing that starts or stops effects, so at most one effect is ever writing to the fixtures.

use std::{mem, sync::Arc, time::Duration};

use tracing::{debug, error, info, trace};

use crate::{
    color,
    dmx::FixtureSink,
    effects::{
        report, ColorCycle, EffectLoop, Highlight, RawDmxPulse, SceneChase, MAX_CHASE_DELAY,
        MIN_CHASE_DELAY,
    },
    fixture::Fixture,
    lifecycle::LifecycleError,
    protocol::{self, Action, Command, PacketKind, Payload},
    scenes::{SceneStore, Snapshot},
};

mod motion;

/// How much one press changes the chase delay.
pub const CHASE_STEP: Duration = Duration::from_millis(10);

/// How much one press changes a channel in manual DMX.
pub const MANUAL_DMX_STEP: i16 = 5;

/// What the operator is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Chase,
    Idle,
    LightSelection,
    ControlSelection,
    ColorWheel,
    ManualDmx,
    Preset,
    Party,
    Scary,
}

impl Mode {
    #[cfg(test)]
    pub const ALL: [Mode; 9] = [
        Mode::Chase,
        Mode::Idle,
        Mode::LightSelection,
        Mode::ControlSelection,
        Mode::ColorWheel,
        Mode::ManualDmx,
        Mode::Preset,
        Mode::Party,
        Mode::Scary,
    ];

    /// The byte sent to the controller in heartbeats.
    pub fn code(&self) -> u8 {
        match self {
            Mode::Chase => 0,
            Mode::Idle => 1,
            Mode::LightSelection => 2,
            Mode::ControlSelection => 3,
            Mode::ColorWheel => 4,
            Mode::ManualDmx => 5,
            Mode::Preset => 6,
            Mode::Party => 7,
            Mode::Scary => 8,
        }
    }
}

/// The preview running in control selection, and what committing it leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staged {
    RawDmx,
    Rainbow,
    Preset,
}

impl Staged {
    pub fn index(&self) -> i8 {
        match self {
            Staged::RawDmx => -1,
            Staged::Rainbow => 0,
            Staged::Preset => 1,
        }
    }

    fn next(self, can_edit_raw_dmx: bool) -> Staged {
        match self {
            Staged::RawDmx => Staged::Rainbow,
            Staged::Rainbow => Staged::Preset,
            Staged::Preset if can_edit_raw_dmx => Staged::RawDmx,
            Staged::Preset => Staged::Rainbow,
        }
    }

    fn previous(self, can_edit_raw_dmx: bool) -> Staged {
        match self {
            Staged::Preset => Staged::Rainbow,
            Staged::Rainbow if can_edit_raw_dmx => Staged::RawDmx,
            Staged::Rainbow => Staged::Preset,
            Staged::RawDmx => Staged::Preset,
        }
    }
}

/// Everything the operator has chosen so far. Only the console changes it.
#[derive(Debug, Clone)]
pub struct ConsoleState {
    pub mode: Mode,
    /// The fixture under the cursor.
    pub light_index: usize,
    pub preset_index: usize,
    pub staged: Staged,
    /// The channel being edited in manual DMX.
    pub channel_index: usize,
    /// Selection flags per fixture, only meaningful in light selection.
    pub selected: Vec<bool>,
    /// The fixtures captured when the selection was committed, in address order.
    pub working_set: Vec<usize>,
    /// Only true when every fixture in the working set has the same channel count.
    pub can_edit_raw_dmx: bool,
    pub chase_delay: Duration,
}

enum ActiveEffect {
    Inactive,
    Highlight(EffectLoop<Highlight>),
    Cycle(EffectLoop<ColorCycle>),
    Pulse(EffectLoop<RawDmxPulse>),
    Chase(EffectLoop<SceneChase>),
}

impl ActiveEffect {
    fn stop(self, timeout: Duration) -> Result<(), LifecycleError> {
        match self {
            ActiveEffect::Inactive => Ok(()),
            ActiveEffect::Highlight(effect) => effect.stop(timeout),
            ActiveEffect::Cycle(effect) => effect.stop(timeout),
            ActiveEffect::Pulse(effect) => effect.stop(timeout),
            ActiveEffect::Chase(effect) => effect.stop(timeout),
        }
    }
}

type Transition = fn(&mut Console) -> Result<(), LifecycleError>;

/// The transition for a user action in a mode. Missing pairs are no-ops.
fn transition(mode: Mode, action: Action) -> Option<Transition> {
    use Action::*;

    let transition: Transition = match (mode, action) {
        (Mode::Idle, Left) => Console::previous_scene,
        (Mode::Idle, Right) => Console::next_scene,
        (Mode::Idle, Down) => Console::return_to_live_scene,
        (Mode::Idle, B1) => Console::enter_light_selection,
        (Mode::Idle, B2) => Console::start_chase,
        (Mode::Idle, Ps2) => Console::save_new_scene,
        (Mode::Idle, Ps2Long) => Console::delete_scene,
        (Mode::Idle, Konami) => Console::enter_party,
        (Mode::Idle, ReverseKonami) => Console::enter_scary,

        (Mode::LightSelection, Left) => Console::cursor_previous,
        (Mode::LightSelection, Right) => Console::cursor_next,
        (Mode::LightSelection, Ps2) => Console::toggle_selected,
        (Mode::LightSelection, Ps2Long) => Console::clear_selection,
        (Mode::LightSelection, B1) => Console::commit_selection,
        (Mode::LightSelection, B2) => Console::leave_light_selection,

        (Mode::ControlSelection, Left) => Console::stage_previous,
        (Mode::ControlSelection, Right) => Console::stage_next,
        (Mode::ControlSelection, B1) => Console::commit_staged,
        (Mode::ControlSelection, B2) => Console::back_to_light_selection,

        (Mode::ColorWheel | Mode::ManualDmx | Mode::Preset, B1) => Console::save_and_select,
        (Mode::ColorWheel | Mode::ManualDmx | Mode::Preset, B2) => {
            Console::back_to_control_selection
        }

        (Mode::ManualDmx, Left) => Console::channel_previous,
        (Mode::ManualDmx, Right) => Console::channel_next,
        (Mode::ManualDmx, Up) => Console::channel_up,
        (Mode::ManualDmx, Down) => Console::channel_down,
        (Mode::ManualDmx, Ps2) => Console::clear_working_set,

        (Mode::Preset, Left) => Console::preset_previous,
        (Mode::Preset, Right) => Console::preset_next,

        (Mode::Chase, Up | Right) => Console::chase_slower,
        (Mode::Chase, Down | Left) => Console::chase_faster,
        (Mode::Chase, B2) => Console::stop_chase,

        (Mode::Party | Mode::Scary, Ps2Long) => Console::leave_show,

        _ => return None,
    };
    Some(transition)
}

pub struct Console {
    fixtures: Vec<Fixture>,
    sink: Arc<dyn FixtureSink>,
    scenes: Box<dyn SceneStore>,
    state: ConsoleState,
    effect: ActiveEffect,
    stop_timeout: Duration,
}

impl Console {
    /// Creates an idle console. Fixtures are expected in address order.
    pub fn new(
        fixtures: Vec<Fixture>,
        sink: Arc<dyn FixtureSink>,
        scenes: Box<dyn SceneStore>,
        chase_delay: Duration,
        stop_timeout: Duration,
    ) -> Console {
        let state = ConsoleState {
            mode: Mode::Idle,
            light_index: 0,
            preset_index: 0,
            staged: Staged::Preset,
            channel_index: 0,
            selected: vec![false; fixtures.len()],
            working_set: Vec::new(),
            can_edit_raw_dmx: false,
            chase_delay: chase_delay.clamp(MIN_CHASE_DELAY, MAX_CHASE_DELAY),
        };

        Console {
            fixtures,
            sink,
            scenes,
            state,
            effect: ActiveEffect::Inactive,
            stop_timeout,
        }
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    #[cfg(test)]
    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    /// Applies one command. Returns true if the controller should get a heartbeat right away,
    /// which is whenever the mode changed or the payload made no sense in the current mode.
    /// Errors are stop timeouts and spawn failures, and are fatal.
    pub fn handle(&mut self, command: &Command) -> Result<bool, LifecycleError> {
        let before = self.state.mode;

        match (command.kind, &command.payload) {
            (PacketKind::Poll, _) => {
                trace!("Ignoring poll");
                return Ok(false);
            }
            (PacketKind::PollReply, Payload::Status(status)) => {
                info!(
                    battery = status.battery,
                    error_code = status.error_code,
                    status = status.message,
                    "Controller status"
                );
                return Ok(false);
            }
            (PacketKind::PollReply, _) => return Ok(false),
            (PacketKind::Data, Payload::UserAction(code)) => match Action::from_code(*code) {
                Some(action) => match transition(before, action) {
                    Some(transition) => transition(self)?,
                    None => trace!(?action, mode = ?before, "Nothing to do"),
                },
                None => debug!(code, "Unknown action"),
            },
            (PacketKind::Data, Payload::Joystick { x, y }) if before == Mode::ColorWheel => {
                self.apply_wheel(*x, *y);
                return Ok(false);
            }
            (PacketKind::Data, Payload::Gyro { x, y, z })
                if matches!(before, Mode::Party | Mode::Scary) =>
            {
                self.apply_motion(protocol::gyro_magnitude(*x, *y, *z));
                return Ok(false);
            }
            (PacketKind::Data, payload) => {
                debug!(?payload, mode = ?before, "Payload not expected in this mode");
                return Ok(true);
            }
        }

        let after = self.state.mode;
        if after != before {
            info!(from = ?before, to = ?after, "Mode changed");
        }
        Ok(after != before)
    }

    /// Logs where the operator is.
    pub fn log_status(&self) {
        let selected: Vec<usize> = self
            .state
            .selected
            .iter()
            .enumerate()
            .filter_map(|(index, selected)| selected.then_some(index))
            .collect();
        info!(
            mode = ?self.state.mode,
            light = ?self.fixtures.get(self.state.light_index).map(Fixture::name),
            ?selected,
            working_set = ?self.state.working_set,
            staged = ?self.state.staged,
            control = self.state.staged.index(),
            scenes = self.scenes.count(),
            scene = ?self.scenes.current_index(),
            chase_delay = ?self.state.chase_delay,
            "Console status"
        );
    }

    /// Stops whichever effect is running.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        self.stop_effect()
    }

    /// A timed out effect is left running and may keep writing next to whoever takes over the
    /// sink.
    fn stop_effect(&mut self) -> Result<(), LifecycleError> {
        let effect = mem::replace(&mut self.effect, ActiveEffect::Inactive);
        let result = effect.stop(self.stop_timeout);
        if let Err(LifecycleError::StopTimeout { name, timeout }) = &result {
            error!(worker = %name, ?timeout, "Effect did not stop and may still be writing");
        }
        result
    }

    fn working_fixtures(&self) -> impl Iterator<Item = &Fixture> {
        self.state
            .working_set
            .iter()
            .filter_map(|index| self.fixtures.get(*index))
    }

    /// Puts the live, unsaved scene back on the fixtures.
    fn revert_scene(&self) {
        report(self.sink.set_all(self.scenes.current().values()));
    }

    /// Makes whatever is on the fixtures the live scene.
    fn save_scene(&mut self) {
        self.scenes.set_current(self.sink.get_all());
    }

    fn start_highlight(&mut self) -> Result<(), LifecycleError> {
        self.stop_effect()?;

        let mut highlight = Highlight::new();
        if let Some(fixture) = self.fixtures.get(self.state.light_index) {
            highlight.add_light(self.state.light_index, fixture, self.sink.as_ref());
        }
        self.effect = ActiveEffect::Highlight(EffectLoop::start(highlight, self.sink.clone())?);
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), LifecycleError> {
        self.stop_effect()?;

        let fixtures: Vec<Fixture> = self.working_fixtures().cloned().collect();
        let sink = self.sink.clone();
        self.effect = match self.state.staged {
            Staged::RawDmx => {
                let pulse = RawDmxPulse::new(fixtures, &sink.get_all());
                ActiveEffect::Pulse(EffectLoop::start(pulse, sink)?)
            }
            Staged::Rainbow => {
                ActiveEffect::Cycle(EffectLoop::start(ColorCycle::rainbow(fixtures), sink)?)
            }
            Staged::Preset => {
                ActiveEffect::Cycle(EffectLoop::start(ColorCycle::presets(fixtures), sink)?)
            }
        };
        Ok(())
    }

    fn previous_scene(&mut self) -> Result<(), LifecycleError> {
        let scene = self.scenes.previous();
        report(self.sink.set_all(scene.values()));
        debug!(scene = ?self.scenes.current_index(), "Previous scene");
        Ok(())
    }

    fn next_scene(&mut self) -> Result<(), LifecycleError> {
        let scene = self.scenes.next();
        report(self.sink.set_all(scene.values()));
        debug!(scene = ?self.scenes.current_index(), "Next scene");
        Ok(())
    }

    fn return_to_live_scene(&mut self) -> Result<(), LifecycleError> {
        let live = self.scenes.current();
        report(self.sink.set_all(live.values()));
        self.scenes.set_current(*live.values());
        Ok(())
    }

    fn enter_light_selection(&mut self) -> Result<(), LifecycleError> {
        if self.fixtures.is_empty() {
            info!("No fixtures to select");
            return Ok(());
        }

        self.save_scene();
        self.state.light_index = self.state.light_index.min(self.fixtures.len() - 1);
        self.start_highlight()?;
        self.state.mode = Mode::LightSelection;
        Ok(())
    }

    fn start_chase(&mut self) -> Result<(), LifecycleError> {
        let Some(chase) = SceneChase::new(self.scenes.snapshots(), self.state.chase_delay) else {
            info!(
                scenes = self.scenes.count(),
                "A chase needs at least two scenes"
            );
            return Ok(());
        };

        self.stop_effect()?;
        self.effect = ActiveEffect::Chase(EffectLoop::start(chase, self.sink.clone())?);
        self.state.mode = Mode::Chase;
        Ok(())
    }

    /// Only the live scene can be saved. A saved scene is already saved.
    fn save_new_scene(&mut self) -> Result<(), LifecycleError> {
        if let Some(scene) = self.scenes.current_index() {
            debug!(scene, "Scene is already saved");
            return Ok(());
        }

        self.scenes.append(Snapshot::new(self.sink.get_all()));
        info!(scenes = self.scenes.count(), "Scene saved");
        Ok(())
    }

    fn delete_scene(&mut self) -> Result<(), LifecycleError> {
        let scene = self.scenes.current_index();
        if self.scenes.delete_current() {
            info!(?scene, scenes = self.scenes.count(), "Scene deleted");
            self.revert_scene();
        }
        Ok(())
    }

    fn enter_party(&mut self) -> Result<(), LifecycleError> {
        self.save_scene();
        self.state.mode = Mode::Party;
        Ok(())
    }

    fn enter_scary(&mut self) -> Result<(), LifecycleError> {
        self.save_scene();
        self.state.mode = Mode::Scary;
        Ok(())
    }

    fn leave_show(&mut self) -> Result<(), LifecycleError> {
        self.revert_scene();
        self.state.mode = Mode::Idle;
        Ok(())
    }

    fn cursor_previous(&mut self) -> Result<(), LifecycleError> {
        self.move_cursor(false);
        Ok(())
    }

    fn cursor_next(&mut self) -> Result<(), LifecycleError> {
        self.move_cursor(true);
        Ok(())
    }

    /// Moves the cursor with wraparound. The fixture left behind stops pulsing unless it is
    /// selected.
    fn move_cursor(&mut self, forward: bool) {
        let count = self.fixtures.len();
        if count == 0 {
            return;
        }

        let old = self.state.light_index;
        let new = if forward {
            (old + 1) % count
        } else {
            (old + count - 1) % count
        };

        if let ActiveEffect::Highlight(highlight) = &self.effect {
            let sink = self.sink.as_ref();
            let keep_old = self.state.selected.get(old).copied().unwrap_or(false);
            let fixture = &self.fixtures[new];
            highlight.with(|highlight| {
                if !keep_old {
                    highlight.remove_light(old, sink);
                }
                highlight.resync_default_color();
                highlight.add_light(new, fixture, sink);
            });
        }

        self.state.light_index = new;
        debug!(light = self.fixtures[new].name(), "Cursor moved");
    }

    fn toggle_selected(&mut self) -> Result<(), LifecycleError> {
        if let Some(selected) = self.state.selected.get_mut(self.state.light_index) {
            *selected = !*selected;
            debug!(
                light = self.state.light_index,
                selected = *selected,
                "Selection toggled"
            );
        }
        Ok(())
    }

    /// Deselects everything. Only the fixture under the cursor keeps pulsing.
    fn clear_selection(&mut self) -> Result<(), LifecycleError> {
        self.state.selected.fill(false);

        let cursor = self.state.light_index;
        if let ActiveEffect::Highlight(highlight) = &self.effect {
            let sink = self.sink.as_ref();
            highlight.with(|highlight| {
                for index in highlight.indices() {
                    if index != cursor {
                        highlight.remove_light(index, sink);
                    }
                }
            });
        }
        Ok(())
    }

    fn commit_selection(&mut self) -> Result<(), LifecycleError> {
        let cursor = self.state.light_index;
        let working_set: Vec<usize> = (0..self.fixtures.len())
            .filter(|index| {
                *index == cursor || self.state.selected.get(*index).copied().unwrap_or(false)
            })
            .collect();
        let can_edit_raw_dmx = working_set.windows(2).all(|pair| {
            self.fixtures[pair[0]].channel_count() == self.fixtures[pair[1]].channel_count()
        });

        self.stop_effect()?;
        self.state.selected.fill(false);
        self.revert_scene();

        info!(?working_set, can_edit_raw_dmx, "Selection committed");
        self.state.working_set = working_set;
        self.state.can_edit_raw_dmx = can_edit_raw_dmx;
        self.state.staged = Staged::Preset;
        self.start_preview()?;
        self.state.mode = Mode::ControlSelection;
        Ok(())
    }

    fn leave_light_selection(&mut self) -> Result<(), LifecycleError> {
        self.stop_effect()?;
        self.state.selected.fill(false);
        self.revert_scene();
        self.state.mode = Mode::Idle;
        Ok(())
    }

    fn stage_next(&mut self) -> Result<(), LifecycleError> {
        self.restage(self.state.staged.next(self.state.can_edit_raw_dmx))
    }

    fn stage_previous(&mut self) -> Result<(), LifecycleError> {
        self.restage(self.state.staged.previous(self.state.can_edit_raw_dmx))
    }

    fn restage(&mut self, staged: Staged) -> Result<(), LifecycleError> {
        self.stop_effect()?;
        self.revert_scene();
        self.state.staged = staged;
        debug!(?staged, "Preview staged");
        self.start_preview()
    }

    fn commit_staged(&mut self) -> Result<(), LifecycleError> {
        match self.state.staged {
            Staged::RawDmx if !self.state.can_edit_raw_dmx => {
                debug!("Raw DMX needs fixtures with matching channel counts");
            }
            Staged::RawDmx => {
                self.stop_effect()?;
                self.revert_scene();
                self.state.channel_index = 0;
                self.state.mode = Mode::ManualDmx;
            }
            Staged::Rainbow => {
                self.stop_effect()?;
                self.state.mode = Mode::ColorWheel;
            }
            Staged::Preset => {
                self.stop_effect()?;
                self.state.mode = Mode::Preset;
            }
        }
        Ok(())
    }

    fn back_to_light_selection(&mut self) -> Result<(), LifecycleError> {
        self.stop_effect()?;
        self.revert_scene();
        self.start_highlight()?;
        self.state.mode = Mode::LightSelection;
        Ok(())
    }

    /// Keeps the edit and goes back to picking lights.
    fn save_and_select(&mut self) -> Result<(), LifecycleError> {
        self.stop_effect()?;
        self.save_scene();
        self.start_highlight()?;
        self.state.mode = Mode::LightSelection;
        Ok(())
    }

    /// Drops the edit and brings back the preview it was committed from.
    fn back_to_control_selection(&mut self) -> Result<(), LifecycleError> {
        self.stop_effect()?;
        self.revert_scene();
        self.start_preview()?;
        self.state.mode = Mode::ControlSelection;
        Ok(())
    }

    fn editable_channels(&self) -> usize {
        self.working_fixtures()
            .next()
            .map_or(0, Fixture::channel_count)
    }

    fn channel_previous(&mut self) -> Result<(), LifecycleError> {
        let count = self.editable_channels();
        if count > 0 {
            self.state.channel_index = (self.state.channel_index + count - 1) % count;
            debug!(channel = self.state.channel_index, "Channel selected");
        }
        Ok(())
    }

    fn channel_next(&mut self) -> Result<(), LifecycleError> {
        let count = self.editable_channels();
        if count > 0 {
            self.state.channel_index = (self.state.channel_index + 1) % count;
            debug!(channel = self.state.channel_index, "Channel selected");
        }
        Ok(())
    }

    fn channel_up(&mut self) -> Result<(), LifecycleError> {
        self.adjust_channel(MANUAL_DMX_STEP);
        Ok(())
    }

    fn channel_down(&mut self) -> Result<(), LifecycleError> {
        self.adjust_channel(-MANUAL_DMX_STEP);
        Ok(())
    }

    fn adjust_channel(&self, delta: i16) {
        let frame = self.sink.get_all();
        let offset = self.state.channel_index;
        for fixture in self.working_fixtures() {
            let Some(current) = fixture.values(&frame).get(offset).copied() else {
                continue;
            };
            let value = (i16::from(current) + delta).clamp(0, i16::from(u8::MAX)) as u8;
            report(fixture.set_channel(self.sink.as_ref(), offset, value));
        }
    }

    fn clear_working_set(&mut self) -> Result<(), LifecycleError> {
        for fixture in self.working_fixtures() {
            report(fixture.clear(self.sink.as_ref()));
        }
        Ok(())
    }

    fn preset_previous(&mut self) -> Result<(), LifecycleError> {
        let count = color::PRESETS.len();
        self.state.preset_index = (self.state.preset_index + count - 1) % count;
        self.apply_preset();
        Ok(())
    }

    fn preset_next(&mut self) -> Result<(), LifecycleError> {
        self.state.preset_index = (self.state.preset_index + 1) % color::PRESETS.len();
        self.apply_preset();
        Ok(())
    }

    fn apply_preset(&self) {
        let color = color::PRESETS[self.state.preset_index];
        for fixture in self.working_fixtures() {
            report(fixture.set_color(self.sink.as_ref(), color));
            report(fixture.set_dimmer(self.sink.as_ref(), u8::MAX));
        }
    }

    fn chase_slower(&mut self) -> Result<(), LifecycleError> {
        self.set_chase_delay((self.state.chase_delay + CHASE_STEP).min(MAX_CHASE_DELAY));
        Ok(())
    }

    fn chase_faster(&mut self) -> Result<(), LifecycleError> {
        self.set_chase_delay(
            self.state
                .chase_delay
                .saturating_sub(CHASE_STEP)
                .max(MIN_CHASE_DELAY),
        );
        Ok(())
    }

    fn set_chase_delay(&mut self, delay: Duration) {
        self.state.chase_delay = delay;
        if let ActiveEffect::Chase(chase) = &self.effect {
            chase.with(|chase| chase.set_delay(delay));
        }
        debug!(?delay, "Chase delay changed");
    }

    fn stop_chase(&mut self) -> Result<(), LifecycleError> {
        self.stop_effect()?;
        self.revert_scene();
        self.state.mode = Mode::Idle;
        Ok(())
    }

    fn apply_wheel(&self, x: i32, y: i32) {
        let color = color::wheel(x, y);
        trace!(x, y, ?color, "Color wheel");
        for fixture in self.working_fixtures() {
            report(fixture.set_color(self.sink.as_ref(), color));
        }
    }

    fn apply_motion(&self, magnitude: u32) {
        let mut rng = rand::thread_rng();
        for fixture in self.fixtures.iter() {
            let (color, dimmer) = match self.state.mode {
                Mode::Party => (
                    motion::party_color(&mut rng),
                    motion::party_dimmer(magnitude),
                ),
                _ => (motion::scary_color(), motion::scary_dimmer(magnitude)),
            };
            report(fixture.set_color(self.sink.as_ref(), color));
            report(fixture.set_dimmer(self.sink.as_ref(), dimmer));
        }
    }
}
