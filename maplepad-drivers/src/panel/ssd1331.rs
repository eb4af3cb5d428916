//! SSD1331 OLED Display Driver
//!
//! Driver for 96x64 16-bit colour OLED modules via SPI. Commands and their
//! parameters go out with D/C low; pixel data with D/C high, RGB565
//! big-endian.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

use maplepad_display::{DisplayError, PanelSink, PANEL_HEIGHT, PANEL_WIDTH};

/// SSD1331 commands
#[allow(dead_code)]
mod cmd {
    pub const SET_COLUMN: u8 = 0x15;
    pub const SET_ROW: u8 = 0x75;
    pub const CLEAR_WINDOW: u8 = 0x25;
    pub const CONTRAST_A: u8 = 0x81;
    pub const CONTRAST_B: u8 = 0x82;
    pub const CONTRAST_C: u8 = 0x83;
    pub const MASTER_CURRENT: u8 = 0x87;
    pub const PRECHARGE_A: u8 = 0x8A;
    pub const PRECHARGE_B: u8 = 0x8B;
    pub const PRECHARGE_C: u8 = 0x8C;
    pub const SET_REMAP: u8 = 0xA0;
    pub const START_LINE: u8 = 0xA1;
    pub const DISPLAY_OFFSET: u8 = 0xA2;
    pub const NORMAL_DISPLAY: u8 = 0xA4;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const MASTER_CONFIG: u8 = 0xAD;
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const POWER_SAVE: u8 = 0xB0;
    pub const PHASE_PERIOD: u8 = 0xB1;
    pub const CLOCK_DIV: u8 = 0xB3;
    pub const PRECHARGE_LEVEL: u8 = 0xBB;
    pub const VCOMH: u8 = 0xBE;
}

/// Remap byte: RGB565, COM split, scan bottom-up
const REMAP_RGB565: u8 = 0x72;

/// Clear-window needs this long before the next command
const CLEAR_SETTLE_US: u32 = 500;

const MAX_COLUMN: u8 = (PANEL_WIDTH - 1) as u8;
const MAX_ROW: u8 = (PANEL_HEIGHT - 1) as u8;
const ROW_BYTES: usize = PANEL_WIDTH * 2;

/// SSD1331 OLED driver
pub struct Ssd1331<SPI, DC, RST, D> {
    spi: SPI,
    dc: DC,
    rst: RST,
    delay: D,
}

impl<SPI, DC, RST, D> Ssd1331<SPI, DC, RST, D>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    D: DelayNs,
{
    /// Create a new SSD1331 driver
    pub fn new(spi: SPI, dc: DC, rst: RST, delay: D) -> Self {
        Self {
            spi,
            dc,
            rst,
            delay,
        }
    }

    /// Give the bus and pins back
    pub fn release(self) -> (SPI, DC, RST, D) {
        (self.spi, self.dc, self.rst, self.delay)
    }

    /// Pulse the reset line
    fn hard_reset(&mut self) -> Result<(), DisplayError> {
        self.rst.set_high().map_err(|_| DisplayError::Communication)?;
        self.delay.delay_ms(1);
        self.rst.set_low().map_err(|_| DisplayError::Communication)?;
        self.delay.delay_ms(10);
        self.rst.set_high().map_err(|_| DisplayError::Communication)?;
        self.delay.delay_ms(10);
        Ok(())
    }

    /// Send command bytes (D/C low)
    fn command(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_low().map_err(|_| DisplayError::Communication)?;
        self.spi.write(bytes).map_err(|_| DisplayError::Communication)
    }

    /// Send pixel bytes (D/C high)
    fn data(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_high().map_err(|_| DisplayError::Communication)?;
        self.spi.write(bytes).map_err(|_| DisplayError::Communication)
    }

    /// Address the whole panel for the next pixel stream
    fn full_window(&mut self) -> Result<(), DisplayError> {
        self.command(&[cmd::SET_COLUMN, 0, MAX_COLUMN])?;
        self.command(&[cmd::SET_ROW, 0, MAX_ROW])
    }

    /// Set the three colour contrast currents
    pub fn set_contrast(&mut self, a: u8, b: u8, c: u8) -> Result<(), DisplayError> {
        self.command(&[cmd::CONTRAST_A, a, cmd::CONTRAST_B, b, cmd::CONTRAST_C, c])
    }

    /// Turn display on/off
    pub fn set_display_on(&mut self, on: bool) -> Result<(), DisplayError> {
        self.command(&[if on { cmd::DISPLAY_ON } else { cmd::DISPLAY_OFF }])
    }
}

impl<SPI, DC, RST, D> PanelSink for Ssd1331<SPI, DC, RST, D>
where
    SPI: SpiDevice,
    DC: OutputPin,
    RST: OutputPin,
    D: DelayNs,
{
    fn initialize(&mut self) -> Result<(), DisplayError> {
        self.hard_reset()?;

        #[rustfmt::skip]
        let init_cmds: &[u8] = &[
            cmd::DISPLAY_OFF,
            cmd::SET_REMAP, REMAP_RGB565,
            cmd::START_LINE, 0x00,
            cmd::DISPLAY_OFFSET, 0x00,
            cmd::NORMAL_DISPLAY,
            cmd::SET_MUX_RATIO, MAX_ROW,
            cmd::MASTER_CONFIG, 0x8E, // External VCC
            cmd::POWER_SAVE, 0x0B, // Power save off
            cmd::PHASE_PERIOD, 0x31,
            cmd::CLOCK_DIV, 0xF0,
            cmd::PRECHARGE_A, 0x64,
            cmd::PRECHARGE_B, 0x78,
            cmd::PRECHARGE_C, 0x64,
            cmd::PRECHARGE_LEVEL, 0x3A,
            cmd::VCOMH, 0x3E,
            cmd::MASTER_CURRENT, 0x06,
        ];
        self.command(init_cmds)?;
        self.set_contrast(0x91, 0x50, 0x7D)?;
        self.clear()?;
        self.set_display_on(true)
    }

    fn refresh(&mut self, pixels: &[u16]) -> Result<(), DisplayError> {
        if pixels.len() != PANEL_WIDTH * PANEL_HEIGHT {
            return Err(DisplayError::BufferOverflow);
        }
        self.full_window()?;

        let mut row = [0u8; ROW_BYTES];
        for line in pixels.chunks_exact(PANEL_WIDTH) {
            for (out, &px) in row.chunks_exact_mut(2).zip(line) {
                out.copy_from_slice(&px.to_be_bytes());
            }
            self.data(&row)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.command(&[cmd::CLEAR_WINDOW, 0, 0, MAX_COLUMN, MAX_ROW])?;
        self.delay.delay_us(CLEAR_SETTLE_US);
        Ok(())
    }
}
