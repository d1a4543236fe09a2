//! Controller profile, selected by cargo feature.

use embassy_nrf::gpio::{Input, Output};
use embassy_time::Delay;
use retro_core::{AtariPad, MegaDrivePad};

use crate::board::SensePin;

#[cfg(not(any(
    feature = "pad-megadrive",
    feature = "pad-megadrive-m30",
    feature = "pad-atari",
    feature = "pad-atari-keyboard"
)))]
compile_error!(
    "select a controller profile: pad-megadrive, pad-megadrive-m30, pad-atari or pad-atari-keyboard"
);

#[cfg(any(
    all(feature = "pad-megadrive", feature = "pad-megadrive-m30"),
    all(feature = "pad-atari", feature = "pad-atari-keyboard"),
    all(
        any(feature = "pad-megadrive", feature = "pad-megadrive-m30"),
        any(feature = "pad-atari", feature = "pad-atari-keyboard")
    )
))]
compile_error!("only one controller profile can be enabled (use --no-default-features)");

pub type MegaDrive =
    MegaDrivePad<Input<'static>, SensePin<'static>, Output<'static>, Delay>;
pub type Atari = AtariPad<Input<'static>, SensePin<'static>>;

#[cfg(feature = "pad-megadrive")]
pub type Pad = MegaDrive;
#[cfg(feature = "pad-megadrive")]
pub const MAPPER: retro_core::MegaDriveRetroPad = retro_core::MegaDriveRetroPad;

#[cfg(feature = "pad-megadrive-m30")]
pub type Pad = MegaDrive;
#[cfg(feature = "pad-megadrive-m30")]
pub const MAPPER: retro_core::MegaDriveM30 = retro_core::MegaDriveM30;

#[cfg(feature = "pad-atari")]
pub type Pad = Atari;
#[cfg(feature = "pad-atari")]
pub const MAPPER: retro_core::AtariRetroPad = retro_core::AtariRetroPad;

#[cfg(feature = "pad-atari-keyboard")]
pub type Pad = Atari;
#[cfg(feature = "pad-atari-keyboard")]
pub const MAPPER: retro_core::AtariKeyboard = retro_core::AtariKeyboard;
