//! 风速、风向换算
//!
//! 风速计和风向标都接在12位ADC上，这里只负责把ADC读数换算成物理量。

use std::fmt;

/// 风速换算系数：满量程 30m/s / 4096
const SPEED_SCALE: f32 = 0.00732421875;

/// 风向标ADC满量程
const DIRECTION_ADC_RES: u16 = 4095;
/// 8个方向之间的ADC间隔: 585
const DIRECTION_ADC_STEP: u16 = DIRECTION_ADC_RES / 7;
/// 半个间隔，用于判断北和西北两端: 292
const DIRECTION_ADC_HALF_STEP: u16 = DIRECTION_ADC_STEP / 2;
/// 中间方向允许的偏差: ±146
const DIRECTION_TOLERANCE: u16 = DIRECTION_ADC_STEP / 4;

/// 风速ADC读数换算为 m/s
pub fn speed(adc: u16) -> f32 {
    adc as f32 * SPEED_SCALE
}

/// 风向，按风向标位置顺时针排列
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    #[default]
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
}

impl Direction {
    fn from_position(position: u16) -> Self {
        match position {
            0 => Self::North,
            1 => Self::NorthEast,
            2 => Self::East,
            3 => Self::SouthEast,
            4 => Self::South,
            5 => Self::SouthWest,
            6 => Self::West,
            _ => Self::NorthWest,
        }
    }

    /// 风向标位置编号 0-7
    pub fn position(&self) -> u8 {
        *self as u8
    }

    /// 风向简称
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// 风向标
///
/// 读数落在两个方向之间(超出中心 ±146)时保留上一次的方向，初始为北
#[derive(Debug, Default, Clone)]
pub struct WindVane {
    direction: Direction,
}

impl WindVane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// 用一次ADC读数更新风向
    pub fn update(&mut self, adc: u16) -> Direction {
        if adc < DIRECTION_ADC_HALF_STEP {
            self.direction = Direction::North;
        } else if adc > DIRECTION_ADC_RES - DIRECTION_ADC_HALF_STEP {
            self.direction = Direction::NorthWest;
        } else {
            // 1-6 号位置
            let position = (adc + DIRECTION_ADC_HALF_STEP) / DIRECTION_ADC_STEP;
            let center = position * DIRECTION_ADC_STEP;
            // 位置0时中心减容差会下溢
            let low = center.saturating_sub(DIRECTION_TOLERANCE);
            if adc >= low && adc <= center + DIRECTION_TOLERANCE {
                self.direction = Direction::from_position(position);
            }
        }
        self.direction
    }
}
