// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Fixture memory contents for testing `heatcam` without a sensor attached.

/// The number of words in the MLX90640 EEPROM (0x2400 through 0x273F).
pub const EEPROM_WORDS: usize = 0x2740 - 0x2400;

/// The number of RAM words read per frame (0x0400 through 0x073F).
pub const RAM_WORDS: usize = 0x0740 - 0x0400;

/// The number of pixels on the sensor.
pub const NUM_PIXELS: usize = 768;

/// Example MLX90640 EEPROM data from the datasheet (from the worked example).
// Each line is 8 words. The first two lines are empty, as that data is ignored for calibration
// purposes. The next six lines are the shared calibration data.
const DATASHEET_EEPROM_HEADER: [u16; 64] = [
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x4210, 0xFFBB, 0x0202, 0xF202, 0xF2F2, 0xE2E2, 0xD1E1, 0xB1D1,
    0xF10F, 0xF00F, 0xE0EF, 0xE0EF, 0xE1E1, 0xF3F2, 0xF404, 0xE504,
    0x79A6, 0x2F44, 0xFFDD, 0x2210, 0x3333, 0x2233, 0xEF01, 0x9ACC,
    0xEEDC, 0x10FF, 0x2221, 0x3333, 0x2333, 0x0112, 0xEEFF, 0xBBDD,
    0x18EF, 0x2FF1, 0x5952, 0x9D68, 0x5454, 0x0994, 0x6956, 0x5354,
    0x2363, 0xE446, 0xFBB5, 0x044B, 0xF020, 0x9797, 0x9797, 0x2889,
];

/// The per-pixel calibration word used for every pixel in the worked example.
const DATASHEET_PIXEL_WORD: u16 = 0x08A0;

/// The non-pixel RAM words from the worked example, as (offset from 0x0700, value).
const DATASHEET_AUXILIARY_WORDS: [(usize, u16); 6] = [
    // Ambient temperature Vbe
    (0x00, 0x4BF2),
    // Compensation pixel, subpage 0
    (0x08, 0xFFCA),
    // Gain
    (0x0A, 0x1881),
    // Ambient temperature PTAT
    (0x20, 0x06AF),
    // Compensation pixel, subpage 1
    (0x28, 0xFFC8),
    // Pixel supply voltage
    (0x2A, 0xCCC5),
];

/// The raw value of the first pixel in [`ramp_frame_words`].
pub const RAMP_BASE: u16 = 0x0200;

/// The EEPROM contents from the datasheet's worked example.
pub fn eeprom_words() -> [u16; EEPROM_WORDS] {
    let mut eeprom = [DATASHEET_PIXEL_WORD; EEPROM_WORDS];
    eeprom[..DATASHEET_EEPROM_HEADER.len()].copy_from_slice(&DATASHEET_EEPROM_HEADER);
    eeprom
}

/// RAM contents where each pixel's raw value is its index added to [`RAMP_BASE`].
///
/// The auxiliary words are taken from the datasheet's worked example, the reserved words are zero.
pub fn ramp_frame_words() -> [u16; RAM_WORDS] {
    let mut ram = [0u16; RAM_WORDS];
    ram[..NUM_PIXELS]
        .iter_mut()
        .zip(RAMP_BASE..)
        .for_each(|(word, value)| *word = value);
    for (offset, value) in DATASHEET_AUXILIARY_WORDS {
        ram[NUM_PIXELS + offset] = value;
    }
    ram
}
