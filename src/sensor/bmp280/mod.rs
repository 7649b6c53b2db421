use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;

pub mod calibration;
pub mod compensation;

pub use calibration::Calibration;
pub use compensation::{
    CompensatedReading, Compensator, FineTemperature, PressureFormula, RawMeasurement,
};

/// BMP280 默认I2C地址(SDO接地)
pub const DEFAULT_ADDRESS: u8 = 0x76;

const REG_ID: u8 = 0xD0;
const REG_RESET: u8 = 0xE0;
const REG_STATUS: u8 = 0xF3;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_PRESS_MSB: u8 = 0xF7;

/// 软复位命令
const RESET_COMMAND: u8 = 0xB6;

/// 测量被跳过(过采样设置为关闭)时输出的原始值
const SKIPPED_READING: u32 = 0x80000;

/// 过采样倍数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oversampling {
    /// 跳过测量
    Skipped = 0b000,
    X1 = 0b001,
    X2 = 0b010,
    X4 = 0b011,
    X8 = 0b100,
    X16 = 0b101,
}

impl Oversampling {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Self::Skipped,
            0b001 => Self::X1,
            0b010 => Self::X2,
            0b011 => Self::X4,
            0b100 => Self::X8,
            // 0b101 及以上都是16倍
            _ => Self::X16,
        }
    }
}

/// 工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 睡眠模式
    Sleep = 0b00,
    /// 强制模式(测量一次后回到睡眠)
    Forced = 0b01,
    /// 正常模式(按待机时间循环测量)
    Normal = 0b11,
}

impl Mode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Sleep,
            0b11 => Self::Normal,
            // 0b01 和 0b10 都是强制模式
            _ => Self::Forced,
        }
    }
}

/// IIR滤波系数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Off = 0b000,
    X2 = 0b001,
    X4 = 0b010,
    X8 = 0b011,
    X16 = 0b100,
}

impl Filter {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Self::Off,
            0b001 => Self::X2,
            0b010 => Self::X4,
            0b011 => Self::X8,
            _ => Self::X16,
        }
    }
}

/// 正常模式下两次测量之间的待机时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standby {
    Ms0_5 = 0b000,
    Ms62_5 = 0b001,
    Ms125 = 0b010,
    Ms250 = 0b011,
    Ms500 = 0b100,
    Ms1000 = 0b101,
    Ms2000 = 0b110,
    Ms4000 = 0b111,
}

impl Standby {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Self::Ms0_5,
            0b001 => Self::Ms62_5,
            0b010 => Self::Ms125,
            0b011 => Self::Ms250,
            0b100 => Self::Ms500,
            0b101 => Self::Ms1000,
            0b110 => Self::Ms2000,
            _ => Self::Ms4000,
        }
    }
}

/// 传感器配置(ctrl_meas 0xF4 和 config 0xF5 寄存器)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// 温度过采样 osrs_t
    pub temperature: Oversampling,
    /// 压力过采样 osrs_p
    pub pressure: Oversampling,
    pub mode: Mode,
    /// 待机时间 t_sb
    pub standby: Standby,
    pub filter: Filter,
    /// 是否启用3线SPI
    pub spi3w: bool,
}

/// 气象站使用的配置：超高精度、正常模式、最强滤波
impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature: Oversampling::X16,
            pressure: Oversampling::X16,
            mode: Mode::Normal,
            standby: Standby::Ms0_5,
            filter: Filter::X16,
            spi3w: false,
        }
    }
}

impl Settings {
    /// 转换为 (ctrl_meas, config) 寄存器值
    pub fn to_registers(&self) -> (u8, u8) {
        let ctrl_meas =
            ((self.temperature as u8) << 5) | ((self.pressure as u8) << 2) | self.mode as u8;
        let config = ((self.standby as u8) << 5) | ((self.filter as u8) << 2) | self.spi3w as u8;
        (ctrl_meas, config)
    }

    /// 从 (ctrl_meas, config) 寄存器值解析
    pub fn from_registers(ctrl_meas: u8, config: u8) -> Self {
        Self {
            temperature: Oversampling::from_bits(ctrl_meas >> 5),
            pressure: Oversampling::from_bits(ctrl_meas >> 2),
            mode: Mode::from_bits(ctrl_meas),
            standby: Standby::from_bits(config >> 5),
            filter: Filter::from_bits(config >> 2),
            spi3w: config & 0x01 != 0,
        }
    }
}

/// 状态寄存器(0xF3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// 二进制位第3位: 正在转换
    pub measuring: bool,
    /// 二进制位第0位: 正在把NVM数据复制到映像寄存器
    pub im_update: bool,
}

impl From<u8> for Status {
    fn from(data: u8) -> Self {
        Self {
            measuring: data & 0b0000_1000 != 0,
            im_update: data & 0b0000_0001 != 0,
        }
    }
}

/// BMP280 温度、气压传感器驱动
///
/// 驱动只保存地址和配置，每个操作都借用I2C总线，这样同一条总线可以挂多个传感器
#[derive(Debug)]
pub struct BMP280 {
    /// I2C从设备地址
    /// - BMP280的地址通常为: 0x76
    address: u8,
    /// 当前写入的配置
    settings: Settings,
}

/// 实现BMP280传感器操作
impl BMP280 {
    fn bus_error<E: Debug>(err: E) -> anyhow::Error {
        anyhow::anyhow!("BMP280 I2C通信失败: {:?}", err)
    }

    fn read_registers<I2C: I2c>(
        &self,
        bus: &mut I2C,
        register: u8,
        buffer: &mut [u8],
    ) -> anyhow::Result<()> {
        bus.write_read(self.address, &[register], buffer)
            .map_err(Self::bus_error)
    }

    fn write_register<I2C: I2c>(&self, bus: &mut I2C, register: u8, value: u8) -> anyhow::Result<()> {
        bus.write(self.address, &[register, value])
            .map_err(Self::bus_error)
    }

    /// 创建BMP280传感器实例，并写入配置
    pub fn new<I2C: I2c>(
        bus: &mut I2C,
        address: Option<u8>,
        settings: Settings,
    ) -> anyhow::Result<Self> {
        let mut sensor = Self {
            address: address.unwrap_or(DEFAULT_ADDRESS),
            settings,
        };

        // 传感器上电后必须等待2ms以上
        thread::sleep(Duration::from_millis(3));

        let chip_id = sensor.chip_id(bus)?;
        log::debug!("BMP280 芯片ID: 0x{:02X}", chip_id);

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

    /// 读取芯片ID(BMP280为0x58)
    pub fn chip_id<I2C: I2c>(&self, bus: &mut I2C) -> anyhow::Result<u8> {
        let mut id = [0u8];
        self.read_registers(bus, REG_ID, &mut id)?;
        Ok(id[0])
    }

    /// 读取状态寄存器
    pub fn read_status<I2C: I2c>(&self, bus: &mut I2C) -> anyhow::Result<Status> {
        let mut status = [0u8];
        self.read_registers(bus, REG_STATUS, &mut status)?;
        Ok(Status::from(status[0]))
    }

    /// 读取校准数据
    ///
    /// 分三次从 0x88、0x90、0x98 各读取8个字节
    pub fn read_calibration<I2C: I2c>(&self, bus: &mut I2C) -> anyhow::Result<Calibration> {
        let mut parts = [0u64; 3];
        for (part, register) in parts.iter_mut().zip(calibration::CALIBRATION_REGISTERS) {
            let mut data = [0u8; 8];
            self.read_registers(bus, register, &mut data)?;
            *part = Calibration::pack_read(data);
        }

        let calib = Calibration::from_reads(parts);
        log::debug!("BMP280 校准参数: {:?}", calib);

        Ok(calib)
    }

    /// 读取原始温度、压力数据
    pub fn read_raw<I2C: I2c>(&self, bus: &mut I2C) -> anyhow::Result<RawMeasurement> {
        // 传感器正在复制NVM数据时读到的数据不可靠
        if self.read_status(bus)?.im_update {
            return Err(anyhow::anyhow!("传感器正在更新校准数据"));
        }

        // 一次性读取 0xF7-0xFC，保证温度和压力属于同一次测量
        let mut data = [0u8; 6];
        self.read_registers(bus, REG_PRESS_MSB, &mut data)?;

        // 解析20位压力数据 (0xF7-0xF9)
        let pressure =
            ((data[0] as u32) << 12) | ((data[1] as u32) << 4) | ((data[2] as u32) >> 4);
        // 解析20位温度数据 (0xFA-0xFC)
        let temperature =
            ((data[3] as u32) << 12) | ((data[4] as u32) << 4) | ((data[5] as u32) >> 4);

        if pressure == SKIPPED_READING || temperature == SKIPPED_READING {
            return Err(anyhow::anyhow!("温度或压力测量被跳过，请检查过采样配置"));
        }

        // OK
        Ok(RawMeasurement {
            temperature,
            pressure,
        })
    }

    /// 从传感器读取当前配置
    pub fn read_settings<I2C: I2c>(&self, bus: &mut I2C) -> anyhow::Result<Settings> {
        let mut data = [0u8; 2];
        self.read_registers(bus, REG_CTRL_MEAS, &mut data)?;
        Ok(Settings::from_registers(data[0], data[1]))
    }

    /// 写入配置
    pub fn write_settings<I2C: I2c>(
        &mut self,
        bus: &mut I2C,
        settings: Settings,
    ) -> anyhow::Result<()> {
        let (ctrl_meas, config) = settings.to_registers();

        // 正常模式下写入config可能被忽略，先写config再写ctrl_meas
        self.write_register(bus, REG_CONFIG, config)?;
        self.write_register(bus, REG_CTRL_MEAS, ctrl_meas)?;
        self.settings = settings;

        Ok(())
    }

    /// 软复位传感器
    ///
    /// 复位后配置恢复为默认值，校准参数需要重新读取
    pub fn reset<I2C: I2c>(&self, bus: &mut I2C) -> anyhow::Result<()> {
        self.write_register(bus, REG_RESET, RESET_COMMAND)?;

        // 等待重置完成
        thread::sleep(Duration::from_millis(5));

        Ok(())
    }
}
