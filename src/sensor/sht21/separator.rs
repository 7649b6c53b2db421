use crc::{Algorithm, Crc};

/// SHT2x 数据手册 5.7 节的 CRC-8 (x^8 + x^5 + x^4 + 1，初始值0)
pub const CRC_8_SHT21: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0x00,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xA2,
    residue: 0x00,
};

const CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_SHT21);

/// CRC校验策略
///
/// 气象站默认不校验SHT21数据附带的CRC字节，以牺牲可靠性换取读取速度。
/// 需要可靠性时可以改为严格校验，校验失败的数据会被丢弃。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CrcPolicy {
    /// 忽略CRC字节
    #[default]
    Ignore,
    /// 严格校验CRC字节
    Strict,
}

/// 一个原始数据字解析出的结果，湿度和温度二选一
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// 相对湿度(%RH)
    Humidity(f32),
    /// 温度(°C)
    Temperature(f32),
}

/// 状态位第1位：置1为湿度数据，置0为温度数据
const STATUS_HUMIDITY: u16 = 0b10;
/// 换算前需要清零的状态位
const STATUS_MASK: u16 = 0b11;

/// SHT21 原始数据分离器
#[derive(Debug, Default, Clone, Copy)]
pub struct Separator {
    policy: CrcPolicy,
}

impl Separator {
    pub fn new(policy: CrcPolicy) -> Self {
        Self { policy }
    }

    /// 计算CRC8校验和
    pub fn crc8(data: &[u8]) -> u8 {
        CRC.checksum(data)
    }

    /// 把读取到的3个字节(高字节、低字节、CRC)拼接成24位数据字
    pub fn pack_word(bytes: [u8; 3]) -> u32 {
        ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32
    }

    /// 把24位数据字分离为湿度或温度
    ///
    /// - 高16位为测量值，其中最低两位是状态位
    /// - 低8位为CRC字节，只有严格校验策略才会检查
    pub fn separate(&self, word: u32) -> anyhow::Result<Reading> {
        let measurement = ((word >> 8) & 0xFFFF) as u16;

        if self.policy == CrcPolicy::Strict {
            let expected = (word & 0xFF) as u8;
            let actual = Self::crc8(&measurement.to_be_bytes());
            if expected != actual {
                return Err(anyhow::anyhow!(
                    "SHT21数据CRC校验失败: 接收 0x{:02X}, 计算 0x{:02X}",
                    expected,
                    actual
                ));
            }
        }

        let scaled = (measurement & !STATUS_MASK) as f32 / 65536.0;

        if measurement & STATUS_HUMIDITY != 0 {
            Ok(Reading::Humidity(scaled * 125.0 - 6.0))
        } else {
            Ok(Reading::Temperature(scaled * 175.72 - 46.85))
        }
    }
}
