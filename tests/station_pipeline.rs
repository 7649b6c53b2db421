use std::collections::{HashMap, HashSet};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use weather_station::config::StationConfig;
use weather_station::sensor::bmp280::{self, BMP280, Calibration, RawMeasurement};
use weather_station::sensor::sht21::{self, CrcPolicy, Quantity, ReadMode, SHT21, Separator};
use weather_station::solar::SunPosition;
use weather_station::station::{AnalogSample, Station};
use weather_station::std_clock::StdClock;

const BMP280_ADDRESS: u8 = 0x76;
const SHT21_ADDRESS: u8 = 0x40;

/// 内存中的I2C总线，按 (设备地址, 寄存器/命令) 返回预设数据
struct FakeBus {
    responses: HashMap<(u8, u8), Vec<u8>>,
    /// 每个设备最近一次写入的寄存器/命令
    pointers: HashMap<u8, u8>,
    /// 不应答的设备
    offline: HashSet<u8>,
    writes: Vec<(u8, Vec<u8>)>,
}

impl FakeBus {
    fn new() -> Self {
        Self {
            responses: HashMap::new(),
            pointers: HashMap::new(),
            offline: HashSet::new(),
            writes: Vec::new(),
        }
    }

    fn with_response(&mut self, address: u8, register: u8, data: &[u8]) -> &mut Self {
        self.responses.insert((address, register), data.to_vec());
        self
    }

    /// 数据手册示例校准参数和原始读数
    fn station() -> Self {
        let mut bus = Self::new();
        bus.with_response(BMP280_ADDRESS, 0xD0, &[0x58])
            .with_response(BMP280_ADDRESS, 0xF3, &[0x00])
            .with_response(
                BMP280_ADDRESS,
                0x88,
                &[0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E],
            )
            .with_response(
                BMP280_ADDRESS,
                0x90,
                &[0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C, 0x00],
            )
            .with_response(
                BMP280_ADDRESS,
                0x98,
                &[0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17],
            )
            // 压力 415148, 温度 519888
            .with_response(BMP280_ADDRESS, 0xF7, &[0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00])
            .with_response(SHT21_ADDRESS, 0xE7, &[0x3A])
            .with_response(SHT21_ADDRESS, 0xE5, &[0x68, 0x3A, 0x7C])
            .with_response(SHT21_ADDRESS, 0xE3, &[0x63, 0x50, 0x06])
            .with_response(SHT21_ADDRESS, 0xF5, &[0x68, 0x3A, 0x7C])
            .with_response(SHT21_ADDRESS, 0xF3, &[0x63, 0x50, 0x06]);
        bus
    }

    fn wrote(&self, address: u8, bytes: &[u8]) -> bool {
        self.writes
            .iter()
            .any(|(a, data)| *a == address && data.as_slice() == bytes)
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.offline.contains(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    self.writes.push((address, bytes.to_vec()));
                    if let Some(register) = bytes.first() {
                        self.pointers.insert(address, *register);
                    }
                }
                Operation::Read(buffer) => {
                    let register = self.pointers.get(&address).copied().ok_or(ErrorKind::Other)?;
                    let data = self
                        .responses
                        .get(&(address, register))
                        .ok_or(ErrorKind::Other)?;
                    for (dst, src) in buffer.iter_mut().zip(data) {
                        *dst = *src;
                    }
                }
            }
        }
        Ok(())
    }
}

fn reference_calibration() -> Calibration {
    Calibration {
        dig_t1: 27504,
        dig_t2: 26435,
        dig_t3: -1000,
        dig_p1: 36477,
        dig_p2: -10685,
        dig_p3: 3024,
        dig_p4: 2855,
        dig_p5: 140,
        dig_p6: -7,
        dig_p7: 15500,
        dig_p8: -14600,
        dig_p9: 6000,
    }
}

/// 风速 15m/s，风向东，光照等级 500
const ANALOG: AnalogSample = AnalogSample {
    wind_speed: 2048,
    wind_direction: 1170,
    sun_level: 2000,
};

fn sun(elevation: f64) -> SunPosition {
    SunPosition {
        elevation,
        azimuth: 200.0,
    }
}

#[test]
fn bmp280_writes_settings_and_reads_reference_data() {
    let mut bus = FakeBus::station();
    let bmp280 = BMP280::new(&mut bus, None, bmp280::Settings::default()).unwrap();

    assert_eq!(bmp280.address(), BMP280_ADDRESS);
    // config 先于 ctrl_meas 写入
    let config_write = bus
        .writes
        .iter()
        .position(|w| w == &(BMP280_ADDRESS, vec![0xF5, 0x10]))
        .unwrap();
    let ctrl_write = bus
        .writes
        .iter()
        .position(|w| w == &(BMP280_ADDRESS, vec![0xF4, 0xB7]))
        .unwrap();
    assert!(config_write < ctrl_write);

    assert_eq!(bmp280.read_calibration(&mut bus).unwrap(), reference_calibration());
    assert_eq!(
        bmp280.read_raw(&mut bus).unwrap(),
        RawMeasurement {
            temperature: 519888,
            pressure: 415148,
        }
    );
}

#[test]
fn bmp280_rejects_unreliable_reads() {
    let mut bus = FakeBus::station();
    let bmp280 = BMP280::new(&mut bus, None, bmp280::Settings::default()).unwrap();

    bus.with_response(BMP280_ADDRESS, 0xF3, &[0x01]);
    assert!(bmp280.read_raw(&mut bus).is_err());

    bus.with_response(BMP280_ADDRESS, 0xF3, &[0x00])
        .with_response(BMP280_ADDRESS, 0xF7, &[0x80, 0x00, 0x00, 0x7E, 0xED, 0x00]);
    assert!(bmp280.read_raw(&mut bus).is_err());
}

#[test]
fn sht21_keeps_reserved_bits_and_separates_words() {
    let mut bus = FakeBus::station();
    let sht21 = SHT21::new(&mut bus, None, sht21::Settings::default()).unwrap();

    assert_eq!(sht21.address(), SHT21_ADDRESS);
    assert!(bus.wrote(SHT21_ADDRESS, &[0xE6, 0x3A]));

    let (humidity, temperature) = sht21
        .read(&mut bus, &Separator::new(CrcPolicy::Strict))
        .unwrap();
    assert!((humidity - 44.888).abs() < 0.01);
    assert!((temperature - 21.3187).abs() < 0.01);
}

#[test]
fn sht21_no_hold_read_polls_after_command() {
    let mut bus = FakeBus::station();
    let sht21 = SHT21::new(&mut bus, None, sht21::Settings::default()).unwrap();

    let word = sht21
        .read_word(&mut bus, Quantity::Humidity, ReadMode::NoHold)
        .unwrap();

    assert_eq!(word, 0x683A7C);
    assert!(bus.wrote(SHT21_ADDRESS, &[0xF5]));
}

#[test]
fn station_poll_produces_fresh_report() {
    let mut bus = FakeBus::station();
    let bmp280 = BMP280::new(&mut bus, None, bmp280::Settings::default()).unwrap();
    let sht21 = SHT21::new(&mut bus, None, sht21::Settings::default()).unwrap();

    let clock = StdClock::new();
    let calibration = bmp280.read_calibration(&mut bus).unwrap();
    let mut station = Station::new(&clock, StationConfig::default(), calibration);

    let report = station.poll(&mut bus, &bmp280, &sht21, sun(30.0), ANALOG);

    assert!(!report.stale);
    assert_eq!(report.climate.unwrap().temperature_centi, 2508);
    assert!((report.climate.unwrap().pressure_hpa() - 1006.399).abs() < 0.01);
    assert_eq!(report.to_string(), "{200.00|30.00|15|2|500}");
    assert!(report.climate_line().starts_with("21.32|1006.40|44.89|"));
}

#[test]
fn station_keeps_last_report_when_sensor_goes_offline() {
    let mut bus = FakeBus::station();
    let bmp280 = BMP280::new(&mut bus, None, bmp280::Settings::default()).unwrap();
    let sht21 = SHT21::new(&mut bus, None, sht21::Settings::default()).unwrap();

    let clock = StdClock::new();
    let mut station = Station::new(&clock, StationConfig::default(), reference_calibration());
    let fresh = *station.poll(&mut bus, &bmp280, &sht21, sun(30.0), ANALOG);

    bus.offline.insert(SHT21_ADDRESS);
    let report = *station.poll(&mut bus, &bmp280, &sht21, sun(50.0), ANALOG);

    assert!(report.stale);
    assert_eq!(report.climate, fresh.climate);
    assert_eq!(report.humidity, fresh.humidity);
    assert_eq!(report.sun, fresh.sun);
    assert_eq!(report.updated_at, fresh.updated_at);
    assert!(report.to_string().ends_with("}*"));

    bus.offline.clear();
    let report = station.poll(&mut bus, &bmp280, &sht21, sun(50.0), ANALOG);
    assert!(!report.stale);
    assert_eq!(report.sun.elevation, 50.0);
}

#[test]
fn station_retains_sun_after_sunset() {
    let mut bus = FakeBus::station();
    let bmp280 = BMP280::new(&mut bus, None, bmp280::Settings::default()).unwrap();
    let sht21 = SHT21::new(&mut bus, None, sht21::Settings::default()).unwrap();

    let clock = StdClock::new();
    let mut station = Station::new(&clock, StationConfig::default(), reference_calibration());
    let day = station.poll(&mut bus, &bmp280, &sht21, sun(10.0), ANALOG).sun;

    for elevation in [0.0, -6.0, -18.0] {
        let night = station.poll(&mut bus, &bmp280, &sht21, sun(elevation), ANALOG).sun;

        assert_eq!(night.adjusted_elevation, day.adjusted_elevation);
        assert_eq!(night.adjusted_azimuth, day.adjusted_azimuth);
    }
    assert!(!station.report().stale);
}

#[test]
fn bmp280_reset_and_settings_readback() {
    let mut bus = FakeBus::station();
    let bmp280 = BMP280::new(&mut bus, None, bmp280::Settings::default()).unwrap();

    bmp280.reset(&mut bus).unwrap();
    assert!(bus.wrote(BMP280_ADDRESS, &[0xE0, 0xB6]));

    // ctrl_meas, config
    bus.with_response(BMP280_ADDRESS, 0xF4, &[0xB7, 0x10]);
    assert_eq!(bmp280.read_settings(&mut bus).unwrap(), *bmp280.settings());

    bus.with_response(BMP280_ADDRESS, 0xF4, &[0b010_100_01, 0b101_010_0_1]);
    let settings = bmp280.read_settings(&mut bus).unwrap();
    assert_eq!(settings.temperature, bmp280::Oversampling::X2);
    assert_eq!(settings.pressure, bmp280::Oversampling::X8);
    assert_eq!(settings.mode, bmp280::Mode::Forced);
    assert_eq!(settings.standby, bmp280::Standby::Ms1000);
    assert_eq!(settings.filter, bmp280::Filter::X4);
    assert!(settings.spi3w);
}

/// 写入后的用户寄存器: 8/12位分辨率、加热器开、OTP重载禁止，保留位来自 0x3A
const HEATED_REGISTER: u8 = 0x3F;

fn heated_settings() -> sht21::Settings {
    sht21::Settings {
        resolution: sht21::Resolution::Rh8T12,
        battery: false,
        heater: true,
        otp_disable: true,
    }
}

fn user_register_writes(bus: &FakeBus) -> usize {
    bus.writes
        .iter()
        .filter(|w| *w == &(SHT21_ADDRESS, vec![0xE6, HEATED_REGISTER]))
        .count()
}

#[test]
fn sht21_reset_restores_settings() {
    let mut bus = FakeBus::station();
    let mut sht21 = SHT21::new(&mut bus, None, heated_settings()).unwrap();
    assert_eq!(user_register_writes(&bus), 1);

    // 复位后传感器回到默认寄存器值 0x3A
    sht21.reset(&mut bus, true).unwrap();

    assert!(bus.wrote(SHT21_ADDRESS, &[0xFE]));
    assert_eq!(user_register_writes(&bus), 2);
    assert_eq!(*sht21.settings(), heated_settings());
}

#[test]
fn sht21_reset_without_restore_adopts_defaults() {
    let mut bus = FakeBus::station();
    let mut sht21 = SHT21::new(&mut bus, None, heated_settings()).unwrap();

    sht21.reset(&mut bus, false).unwrap();

    assert!(bus.wrote(SHT21_ADDRESS, &[0xFE]));
    assert_eq!(user_register_writes(&bus), 1);
    assert_eq!(*sht21.settings(), sht21::Settings::from_register(0x3A));
    assert_eq!(sht21.settings().resolution, sht21::Resolution::Rh12T14);
    assert!(!sht21.settings().heater);
}
