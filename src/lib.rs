//! 气象站传感器数据处理核心
//!
//! 从BMP280(温度/气压)和SHT21(温度/湿度)读取原始数据，经过校准补偿后
//! 计算海拔高度，并结合外部提供的太阳方位对太阳高度角做大气折射修正。
//! 风速、风向和光照强度由ADC读数换算。

pub mod altitude;
pub mod config;
pub mod sensor;
pub mod solar;
pub mod station;
pub mod std_clock;
pub mod wind;
