use super::calibration::Calibration;

/// 原始20位ADC读数(每个周期由传输层读取一次)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawMeasurement {
    /// 原始温度读数 (0xFA-0xFC)
    pub temperature: u32,
    /// 原始压力读数 (0xF7-0xF9)
    pub pressure: u32,
}

/// 压力补偿公式
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PressureFormula {
    /// 气象站固件使用的简化公式(不含 dig_P2、dig_P3 项)
    #[default]
    Reduced,
    /// 数据手册 3.11.3 节的完整64位公式
    Complete,
}

/// 温度补偿得到的高精度中间值 t_fine
///
/// 只能由 [`Compensator::true_temperature`] 生成，保证压力补偿前温度一定先完成补偿
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FineTemperature(i32);

impl FineTemperature {
    pub fn value(self) -> i32 {
        self.0
    }
}

/// 一个周期内补偿后的温度和压力
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensatedReading {
    /// t_fine 中间值
    pub fine: i32,
    /// 温度，单位 0.01°C
    pub temperature_centi: i16,
    /// 压力，Q24.8 定点数，单位 Pa (数值 / 256)
    pub pressure_q24_8: u32,
    /// 压力，单位 hPa
    pub pressure_hpa: f64,
}

impl CompensatedReading {
    /// 温度(°C)，保留两位小数精度
    pub fn temperature_celsius(&self) -> f32 {
        self.temperature_centi as f32 / 100.0
    }

    /// 压力(hPa)
    pub fn pressure_hpa(&self) -> f64 {
        self.pressure_hpa
    }
}

/// BMP280 温度、压力补偿器，持有传感器的校准参数
#[derive(Debug, Clone)]
pub struct Compensator {
    calib: Calibration,
    formula: PressureFormula,
}

impl Compensator {
    pub fn new(calib: Calibration, formula: PressureFormula) -> Self {
        Self { calib, formula }
    }

    /// 只读的校准参数
    pub fn calibration(&self) -> &Calibration {
        &self.calib
    }

    pub fn formula(&self) -> PressureFormula {
        self.formula
    }

    /// BMP280温度补偿函数
    ///
    /// ## 功能描述
    /// 将原始 ADC 温度值转换为 0.01°C 为单位的温度，并生成压力补偿需要的 t_fine 值。
    /// 运算在32位有符号整型下进行，溢出按二进制补码回绕，与32位参考实现逐位一致。
    ///
    /// ## 参数
    /// - `adc_t`: 从寄存器 0xFA-0xFC 读取的原始20位温度ADC值
    ///
    /// ## 返回
    /// - `(FineTemperature, i16)`: t_fine 值和温度(0.01°C)
    pub fn true_temperature(&self, adc_t: u32) -> (FineTemperature, i16) {
        let adc_t = adc_t as i32;
        let dig_t1 = self.calib.dig_t1 as i32;
        let dig_t2 = self.calib.dig_t2 as i32;
        let dig_t3 = self.calib.dig_t3 as i32;

        let var1 = ((adc_t >> 3) - (dig_t1 << 1)).wrapping_mul(dig_t2) >> 11;
        let delta = (adc_t >> 4) - dig_t1;
        let var2 = (delta.wrapping_mul(delta) >> 12).wrapping_mul(dig_t3) >> 14;

        let t_fine = var1.wrapping_add(var2);
        let temperature = (t_fine.wrapping_mul(5).wrapping_add(128)) >> 8;

        (FineTemperature(t_fine), temperature as i16)
    }

    /// BMP280 压力补偿函数
    ///
    /// ## 功能描述
    /// 使用温度补偿得到的 t_fine，将原始 ADC 压力值转换为 Q24.8 格式的压力(Pa)。
    /// 运算在64位有符号整型下进行。
    ///
    /// ## 返回
    /// - `u32`: 压力，数值 / 256 = Pa；公式除数为0时返回0
    pub fn true_pressure(&self, adc_p: u32, t_fine: FineTemperature) -> u32 {
        let dig_p1 = self.calib.dig_p1 as i64;
        let dig_p2 = self.calib.dig_p2 as i64;
        let dig_p3 = self.calib.dig_p3 as i64;
        let dig_p4 = self.calib.dig_p4 as i64;
        let dig_p5 = self.calib.dig_p5 as i64;
        let dig_p6 = self.calib.dig_p6 as i64;
        let dig_p7 = self.calib.dig_p7 as i64;
        let dig_p8 = self.calib.dig_p8 as i64;
        let dig_p9 = self.calib.dig_p9 as i64;

        // 步骤1: 温度相关变量
        let mut var1 = t_fine.value() as i64 - 128000;

        // 步骤2: 二阶补偿项
        let mut var2 = var1.wrapping_mul(var1).wrapping_mul(dig_p6);
        var2 = var2.wrapping_add(var1.wrapping_mul(dig_p5) << 17);
        var2 = var2.wrapping_add(dig_p4 << 35);

        // 步骤3: 主补偿项
        if self.formula == PressureFormula::Complete {
            var1 = (var1.wrapping_mul(var1).wrapping_mul(dig_p3) >> 8)
                .wrapping_add(var1.wrapping_mul(dig_p2) << 12);
        }
        var1 = ((1_i64 << 47).wrapping_add(var1)).wrapping_mul(dig_p1) >> 33;

        // 步骤4: 除数为0时直接返回0
        if var1 == 0 {
            return 0;
        }

        // 步骤5: 初步压力值
        let mut p = 1048576 - adc_p as i64;
        p = ((p << 31).wrapping_sub(var2)).wrapping_mul(3125).wrapping_div(var1);

        // 步骤6: 最终补偿
        var1 = dig_p9.wrapping_mul(p >> 13).wrapping_mul(p >> 13) >> 25;
        var2 = dig_p8.wrapping_mul(p) >> 19;
        p = (p.wrapping_add(var1).wrapping_add(var2) >> 8).wrapping_add(dig_p7 << 4);

        p.clamp(0, u32::MAX as i64) as u32
    }

    /// 按顺序完成一次温度和压力补偿
    pub fn compensate(&self, raw: RawMeasurement) -> CompensatedReading {
        let (t_fine, temperature_centi) = self.true_temperature(raw.temperature);
        let pressure_q24_8 = self.true_pressure(raw.pressure, t_fine);

        CompensatedReading {
            fine: t_fine.value(),
            temperature_centi,
            pressure_q24_8,
            pressure_hpa: pressure_q24_8 as f64 / 25600.0,
        }
    }
}
