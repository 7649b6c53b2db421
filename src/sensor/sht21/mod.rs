use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;

pub mod separator;

pub use separator::{CrcPolicy, Reading, Separator};

/// SHT21 默认I2C地址
pub const DEFAULT_ADDRESS: u8 = 0x40;

const CMD_HOLD_T: u8 = 0xE3;
const CMD_HOLD_RH: u8 = 0xE5;
const CMD_NO_HOLD_T: u8 = 0xF3;
const CMD_NO_HOLD_RH: u8 = 0xF5;
const CMD_WRITE_USER_REG: u8 = 0xE6;
const CMD_READ_USER_REG: u8 = 0xE7;
const CMD_SOFT_RESET: u8 = 0xFE;

/// 用户寄存器中各配置位
const USER_REG_RESOLUTION: u8 = 0b1000_0001;
const USER_REG_BATTERY: u8 = 0b0100_0000;
const USER_REG_HEATER: u8 = 0b0000_0100;
const USER_REG_OTP_DISABLE: u8 = 0b0000_0010;

/// 测量的物理量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Humidity,
    Temperature,
}

/// 读取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// 保持主机模式：传感器在转换期间拉低SCL，一次读写即可拿到数据
    Hold,
    /// 非保持主机模式：发送命令后等待转换完成再读取
    NoHold,
}

/// 湿度/温度测量分辨率(用户寄存器第7位和第0位)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 湿度12位，温度14位
    Rh12T14 = 0b0000_0000,
    /// 湿度8位，温度12位
    Rh8T12 = 0b0000_0001,
    /// 湿度10位，温度13位
    Rh10T13 = 0b1000_0000,
    /// 湿度11位，温度11位
    Rh11T11 = 0b1000_0001,
}

impl Resolution {
    fn from_register(data: u8) -> Self {
        match data & USER_REG_RESOLUTION {
            0b0000_0000 => Self::Rh12T14,
            0b0000_0001 => Self::Rh8T12,
            0b1000_0000 => Self::Rh10T13,
            _ => Self::Rh11T11,
        }
    }

    /// 非保持主机模式下的最长转换时间
    pub fn conversion_time(&self, quantity: Quantity) -> Duration {
        let millis = match (self, quantity) {
            (Self::Rh12T14, Quantity::Temperature) => 85,
            (Self::Rh12T14, Quantity::Humidity) => 29,
            (Self::Rh8T12, Quantity::Temperature) => 22,
            (Self::Rh8T12, Quantity::Humidity) => 4,
            (Self::Rh10T13, Quantity::Temperature) => 43,
            (Self::Rh10T13, Quantity::Humidity) => 9,
            (Self::Rh11T11, Quantity::Temperature) => 11,
            (Self::Rh11T11, Quantity::Humidity) => 15,
        };
        Duration::from_millis(millis)
    }
}

/// SHT21 用户寄存器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub resolution: Resolution,
    /// 电池电压低于2.25V检测
    pub battery: bool,
    /// 片上加热器(会使温度升高约0.5-1.5°C)
    pub heater: bool,
    /// 禁止复位时从OTP重新加载默认配置
    pub otp_disable: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resolution: Resolution::Rh12T14,
            battery: false,
            heater: false,
            otp_disable: true,
        }
    }
}

impl Settings {
    /// 解析用户寄存器
    pub fn from_register(data: u8) -> Self {
        Self {
            resolution: Resolution::from_register(data),
            battery: data & USER_REG_BATTERY != 0,
            heater: data & USER_REG_HEATER != 0,
            otp_disable: data & USER_REG_OTP_DISABLE != 0,
        }
    }

    /// 合并到用户寄存器，保留位(第3-5位)维持原值
    pub fn to_register(&self, current: u8) -> u8 {
        let mut data = current
            & !(USER_REG_RESOLUTION | USER_REG_BATTERY | USER_REG_HEATER | USER_REG_OTP_DISABLE);
        data |= self.resolution as u8;
        if self.battery {
            data |= USER_REG_BATTERY;
        }
        if self.heater {
            data |= USER_REG_HEATER;
        }
        if self.otp_disable {
            data |= USER_REG_OTP_DISABLE;
        }
        data
    }
}

/// SHT21 温度湿度传感器驱动
#[derive(Debug)]
pub struct SHT21 {
    /// I2C从设备地址
    /// - SHT21的地址固定为: 0x40
    address: u8,
    /// 当前写入的配置
    settings: Settings,
}

/// 实现SHT21传感器操作
impl SHT21 {
    fn bus_error<E: Debug>(err: E) -> anyhow::Error {
        anyhow::anyhow!("SHT21 I2C通信失败: {:?}", err)
    }

    /// 创建SHT21传感器实例，并写入配置
    pub fn new<I2C: I2c>(
        bus: &mut I2C,
        address: Option<u8>,
        settings: Settings,
    ) -> anyhow::Result<Self> {
        // 上电后最多需要15ms才能进入空闲状态
        thread::sleep(Duration::from_millis(15));

        let mut sensor = Self {
            address: address.unwrap_or(DEFAULT_ADDRESS),
            settings,
        };
        sensor.write_settings(bus, settings)?;

        // OK
        Ok(sensor)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn read_user_register<I2C: I2c>(&self, bus: &mut I2C) -> anyhow::Result<u8> {
        let mut data = [0u8];
        bus.write_read(self.address, &[CMD_READ_USER_REG], &mut data)
            .map_err(Self::bus_error)?;
        Ok(data[0])
    }

    /// 读取传感器当前配置
    pub fn read_settings<I2C: I2c>(&self, bus: &mut I2C) -> anyhow::Result<Settings> {
        Ok(Settings::from_register(self.read_user_register(bus)?))
    }

    /// 写入配置
    pub fn write_settings<I2C: I2c>(
        &mut self,
        bus: &mut I2C,
        settings: Settings,
    ) -> anyhow::Result<()> {
        let current = self.read_user_register(bus)?;
        bus.write(self.address, &[CMD_WRITE_USER_REG, settings.to_register(current)])
            .map_err(Self::bus_error)?;
        self.settings = settings;
        Ok(())
    }

    /// 软复位传感器
    ///
    /// - restore: 复位后是否重新写入当前配置(否则保持传感器的默认配置)
    pub fn reset<I2C: I2c>(&mut self, bus: &mut I2C, restore: bool) -> anyhow::Result<()> {
        bus.write(self.address, &[CMD_SOFT_RESET])
            .map_err(Self::bus_error)?;

        // 软复位最多需要15ms
        thread::sleep(Duration::from_millis(15));

        let defaults = self.read_settings(bus)?;
        if restore {
            self.write_settings(bus, self.settings)?;
        } else {
            self.settings = defaults;
        }
        Ok(())
    }

    /// 读取一个24位原始数据字(高字节、低字节、CRC)
    pub fn read_word<I2C: I2c>(
        &self,
        bus: &mut I2C,
        quantity: Quantity,
        mode: ReadMode,
    ) -> anyhow::Result<u32> {
        let mut data = [0u8; 3];
        match mode {
            ReadMode::Hold => {
                let command = match quantity {
                    Quantity::Humidity => CMD_HOLD_RH,
                    Quantity::Temperature => CMD_HOLD_T,
                };
                bus.write_read(self.address, &[command], &mut data)
                    .map_err(Self::bus_error)?;
            }
            ReadMode::NoHold => {
                let command = match quantity {
                    Quantity::Humidity => CMD_NO_HOLD_RH,
                    Quantity::Temperature => CMD_NO_HOLD_T,
                };
                bus.write(self.address, &[command])
                    .map_err(Self::bus_error)?;
                // 等待转换完成
                thread::sleep(self.settings.resolution.conversion_time(quantity));
                bus.read(self.address, &mut data)
                    .map_err(Self::bus_error)?;
            }
        }

        Ok(Separator::pack_word(data))
    }

    /// 先读湿度再读温度，返回两个原始数据字
    pub fn read_words<I2C: I2c>(&self, bus: &mut I2C, mode: ReadMode) -> anyhow::Result<(u32, u32)> {
        let humidity = self.read_word(bus, Quantity::Humidity, mode)?;
        let temperature = self.read_word(bus, Quantity::Temperature, mode)?;
        Ok((humidity, temperature))
    }

    /// 读取并分离湿度和温度
    ///
    /// - 返回（湿度【%RH】，温度【℃】）
    pub fn read<I2C: I2c>(
        &self,
        bus: &mut I2C,
        separator: &Separator,
    ) -> anyhow::Result<(f32, f32)> {
        let (humidity_word, temperature_word) = self.read_words(bus, ReadMode::Hold)?;

        let humidity = match separator.separate(humidity_word)? {
            Reading::Humidity(rh) => rh,
            Reading::Temperature(_) => {
                return Err(anyhow::anyhow!("湿度测量返回了温度数据"));
            }
        };
        let temperature = match separator.separate(temperature_word)? {
            Reading::Temperature(t) => t,
            Reading::Humidity(_) => {
                return Err(anyhow::anyhow!("温度测量返回了湿度数据"));
            }
        };

        // OK
        Ok((humidity, temperature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_keep_reserved_bits() {
        // 复位默认值 0x3A: 分辨率12/14位，OTP重载禁止，保留位 0b0011_1000
        let settings = Settings {
            resolution: Resolution::Rh11T11,
            battery: false,
            heater: true,
            otp_disable: false,
        };

        assert_eq!(settings.to_register(0x3A), 0b1011_1101);
    }

    #[test]
    fn settings_from_reset_register() {
        let settings = Settings::from_register(0x3A);

        assert_eq!(settings.resolution, Resolution::Rh12T14);
        assert!(settings.otp_disable);
        assert!(!settings.heater);
        assert!(!settings.battery);
    }

    #[test]
    fn conversion_time_depends_on_resolution() {
        assert_eq!(
            Resolution::Rh12T14.conversion_time(Quantity::Temperature),
            Duration::from_millis(85)
        );
        assert_eq!(
            Resolution::Rh8T12.conversion_time(Quantity::Humidity),
            Duration::from_millis(4)
        );
    }
}
