/// 温度/压力校准参数的起始寄存器，每次连续读取8个字节
pub const CALIBRATION_REGISTERS: [u8; 3] = [0x88, 0x90, 0x98];

/// 校准参数块的总长度(字节)
pub const CALIBRATION_LEN: usize = 24;

/// BMP280传感器校准参数结构体
///
/// 该结构体存储了从传感器 NVM 中读取的温度/压力校准参数，用于
/// 温度和压力测量的补偿计算。参数在传感器每次复位后只需读取一次。
///
/// # 存储分布
/// - 地址 0x88-0x9F (24字节)，每个系数占两个寄存器，低地址为低字节
///
/// # 注意
/// 校准参数块没有校验和，读到错误的数据也只会得到错误的系数，不会报错。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    // 温度校准参数组
    /// 温度校准系数 1 - 基准偏移量
    ///
    /// - **类型**: 无符号 16 位整数 (u16)
    /// - **地址**: 0x88-0x89
    pub dig_t1: u16,

    /// 温度校准系数 2 - 一阶灵敏度系数
    ///
    /// - **类型**: 有符号 16 位整数 (i16)
    /// - **地址**: 0x8A-0x8B
    pub dig_t2: i16,

    /// 温度校准系数 3 - 二阶非线性系数
    ///
    /// - **类型**: 有符号 16 位整数 (i16)
    /// - **地址**: 0x8C-0x8D
    pub dig_t3: i16,

    // 压力校准参数组
    /// 压力校准系数 1 - 基准压力系数 (u16, 0x8E-0x8F)
    ///
    /// 为0时压力补偿公式的除数为0，补偿结果固定返回0
    pub dig_p1: u16,
    /// 压力校准系数 2 (0x90-0x91)，只在完整公式中使用
    pub dig_p2: i16,
    /// 压力校准系数 3 (0x92-0x93)，只在完整公式中使用
    pub dig_p3: i16,
    /// 压力校准系数 4 (0x94-0x95)
    pub dig_p4: i16,
    /// 压力校准系数 5 (0x96-0x97)
    pub dig_p5: i16,
    /// 压力校准系数 6 (0x98-0x99)
    pub dig_p6: i16,
    /// 压力校准系数 7 - 零点偏移补偿系数 (0x9A-0x9B)
    pub dig_p7: i16,
    /// 压力校准系数 8 (0x9C-0x9D)
    pub dig_p8: i16,
    /// 压力校准系数 9 (0x9E-0x9F)
    pub dig_p9: i16,
}

/// 实现校准参数解析
impl Calibration {
    /// 从64位读数中取出一个16位系数
    ///
    /// 8字节读取时第一个寄存器位于最高字节，所以同一个系数的两个字节是
    /// 高低颠倒的，需要交换字节顺序:
    /// ```text
    /// ((part >> shift) & 0xFF) << 8 | ((part >> shift) & 0xFF00) >> 8
    /// ```
    fn coefficient(part: u64, shift: u32) -> u16 {
        ((part >> shift) as u16).swap_bytes()
    }

    /// 解析三次8字节读取的结果
    ///
    /// - 第1次(0x88): T1 T2 T3 P1
    /// - 第2次(0x90): P2 P3 P4 P5
    /// - 第3次(0x98): P6 P7 P8 P9
    pub fn from_reads(parts: [u64; 3]) -> Self {
        let [first, second, third] = parts;

        Self {
            dig_t1: Self::coefficient(first, 48),
            dig_t2: Self::coefficient(first, 32) as i16,
            dig_t3: Self::coefficient(first, 16) as i16,
            dig_p1: Self::coefficient(first, 0),
            dig_p2: Self::coefficient(second, 48) as i16,
            dig_p3: Self::coefficient(second, 32) as i16,
            dig_p4: Self::coefficient(second, 16) as i16,
            dig_p5: Self::coefficient(second, 0) as i16,
            dig_p6: Self::coefficient(third, 48) as i16,
            dig_p7: Self::coefficient(third, 32) as i16,
            dig_p8: Self::coefficient(third, 16) as i16,
            dig_p9: Self::coefficient(third, 0) as i16,
        }
    }

    /// 把8字节读取结果按寄存器顺序拼接为64位整数(第一个字节在最高位)
    pub fn pack_read(bytes: [u8; 8]) -> u64 {
        u64::from_be_bytes(bytes)
    }

    /// 解析完整的24字节校准参数块(寄存器 0x88-0x9F)
    pub fn from_bytes(block: &[u8; CALIBRATION_LEN]) -> Self {
        let mut parts = [0u64; 3];
        for (part, chunk) in parts.iter_mut().zip(block.chunks_exact(8)) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            *part = Self::pack_read(bytes);
        }

        Self::from_reads(parts)
    }
}
