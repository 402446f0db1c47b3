// Channel mix parameters
//
// The job front end sends one underscore-separated token per channel,
// e.g. fx "2_4_1_6_1_5", volumes "99_99_98_99_99_99", mutes "T_T_T_T_T_T".

use super::FxKind;
use crate::error::{EngineError, EngineResult};
use crate::mixer::CHANNEL_COUNT;
use serde::{Deserialize, Serialize};

/// Per-channel post-processing settings for one mixdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxParams {
    pub fx: [Option<FxKind>; CHANNEL_COUNT],
    pub volume: [u8; CHANNEL_COUNT],
    /// `true` when the channel is audible
    pub channel_enabled: [bool; CHANNEL_COUNT],
    pub selective_mutism: bool,
    pub selective_mutism_value: f64,
}

impl Default for FxParams {
    fn default() -> Self {
        Self {
            fx: [None; CHANNEL_COUNT],
            volume: [100; CHANNEL_COUNT],
            channel_enabled: [true; CHANNEL_COUNT],
            selective_mutism: false,
            selective_mutism_value: 0.0,
        }
    }
}

fn invalid(field: &str, value: &str) -> EngineError {
    EngineError::InvalidConfig(format!("invalid {} '{}'", field, value))
}

/// Splits into exactly one token per channel
fn channel_tokens<'a>(field: &str, value: &'a str) -> EngineResult<[&'a str; CHANNEL_COUNT]> {
    let tokens: Vec<&str> = value.split('_').map(str::trim).collect();
    tokens
        .try_into()
        .map_err(|_| invalid(field, value))
}

fn parse_flag(field: &str, token: &str) -> EngineResult<bool> {
    match token {
        "T" => Ok(true),
        "F" => Ok(false),
        _ => Err(invalid(field, token)),
    }
}

impl FxParams {
    /// Parses the underscore strings of a mix request
    pub fn parse(
        fx_input: &str,
        vol: &str,
        channel_mute_params: &str,
        selective_mutism_switch: &str,
        selective_mutism_value: &str,
    ) -> EngineResult<Self> {
        let mut params = FxParams::default();

        for (slot, token) in params.fx.iter_mut().zip(channel_tokens("fx_input", fx_input)?) {
            *slot = match token {
                "F" | "N" | "None" => None,
                digits => {
                    let index: usize = digits.parse().map_err(|_| invalid("fx_input", digits))?;
                    Some(FxKind::from_index(index)?)
                }
            };
        }

        for (slot, token) in params.volume.iter_mut().zip(channel_tokens("vol", vol)?) {
            let volume: u8 = token.parse().map_err(|_| invalid("vol", token))?;
            if volume > 100 {
                return Err(invalid("vol", token));
            }
            *slot = volume;
        }

        for (slot, token) in params
            .channel_enabled
            .iter_mut()
            .zip(channel_tokens("channel_mute_params", channel_mute_params)?)
        {
            *slot = parse_flag("channel_mute_params", token)?;
        }

        params.selective_mutism =
            parse_flag("selective_mutism_switch", selective_mutism_switch.trim())?;

        let value: f64 = selective_mutism_value
            .trim()
            .parse()
            .map_err(|_| invalid("selective_mutism_value", selective_mutism_value))?;
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid("selective_mutism_value", selective_mutism_value));
        }
        params.selective_mutism_value = value;

        Ok(params)
    }

    fn check_channel(channel: usize) -> EngineResult<()> {
        if channel >= CHANNEL_COUNT {
            return Err(EngineError::InvalidChannel(channel));
        }
        Ok(())
    }

    pub fn effect(&self, channel: usize) -> EngineResult<Option<FxKind>> {
        Self::check_channel(channel)?;
        Ok(self.fx[channel])
    }

    pub fn volume(&self, channel: usize) -> EngineResult<u8> {
        Self::check_channel(channel)?;
        Ok(self.volume[channel])
    }

    pub fn is_enabled(&self, channel: usize) -> EngineResult<bool> {
        Self::check_channel(channel)?;
        Ok(self.channel_enabled[channel])
    }

    /// Mutism amount to apply, zero when the switch is off
    pub fn mutism_amount(&self) -> f64 {
        if self.selective_mutism {
            self.selective_mutism_value
        } else {
            0.0
        }
    }
}
