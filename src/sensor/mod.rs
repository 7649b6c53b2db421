/// BMP280 温度、气压传感器
pub mod bmp280;
/// SHT21 温度、湿度传感器
pub mod sht21;
