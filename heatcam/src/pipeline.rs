// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Sensor bring-up, and turning each new frame into temperatures.

use log::{debug, error, info};

use crate::calibration::{CalibrationService, DefectKind};
use crate::config::Config;
use crate::error::{BringupStep, Fault, SensorError, SensorProtocolError, StatusCode};
use crate::frame::{EepromDump, RawFrame, TemperatureGrid, EEPROM_WORDS};
use crate::sensor::Mlx90640;
use crate::transport::HalfDuplexBus;

/// The number of interpolation passes used when correcting each defect list.
const DEFECT_CORRECTION_ITERATIONS: u8 = 1;

/// A configured sensor along with its calibration, producing a temperature grid per cycle.
pub struct FramePipeline<B, C>
where
    B: HalfDuplexBus,
    C: CalibrationService,
{
    sensor: Mlx90640<B>,
    service: C,
    parameters: C::Parameters,
    emissivity: f32,
    data_timeout_us: u32,
    frame: RawFrame,
    grid: TemperatureGrid,
    ambient_temperature: f32,
}

impl<B, C> FramePipeline<B, C>
where
    B: HalfDuplexBus,
    C: CalibrationService,
{
    /// Configure the sensor and load its calibration.
    ///
    /// The sample rate is set first, then the chess access pattern. The EEPROM is then dumped and
    /// handed to the calibration service. The first failure is returned, and nothing after it is
    /// attempted.
    pub fn bring_up(
        mut sensor: Mlx90640<B>,
        service: C,
        config: &Config,
    ) -> Result<Self, Fault<B::Error>> {
        let sample_rate = config.sample_rate()?;
        sensor
            .set_sample_rate(sample_rate)
            .map_err(Self::during(BringupStep::SetSampleRate))?;
        sensor
            .set_chess_mode()
            .map_err(Self::during(BringupStep::SetChessMode))?;
        let mut eeprom: EepromDump = [0u16; EEPROM_WORDS];
        sensor
            .dump_eeprom(&mut eeprom)
            .map_err(Self::during(BringupStep::DumpEeprom))?;
        let parameters = service
            .extract_parameters(&eeprom)
            .map_err(Self::during(BringupStep::ExtractParameters))?;
        info!(
            "Sensor at 0x{:02X} running at {:?}",
            sensor.address(),
            sample_rate
        );
        Ok(Self {
            sensor,
            service,
            parameters,
            emissivity: config.emissivity,
            data_timeout_us: config.data_timeout_us(),
            frame: RawFrame::new(),
            grid: TemperatureGrid::new(),
            ambient_temperature: 0f32,
        })
    }

    /// Attach the failed bring-up step to an error.
    fn during<S>(step: BringupStep) -> impl FnOnce(S) -> SensorProtocolError<B::Error>
    where
        S: Into<SensorError<B::Error>>,
    {
        move |err| {
            let cause = err.into();
            error!("{}: {}", step.description(), cause.code());
            SensorProtocolError::BringupFailed(step, cause)
        }
    }

    /// Fetch the next frame and update the temperature grid from it.
    ///
    /// Only the pixels in the fetched subpage change, so the grid holds the latest reading of
    /// both subpages. Both defect lists are then corrected. `now` is the platform clock in
    /// microseconds, used to give up on a sensor that never flags new data.
    pub fn acquire<T>(&mut self, now: T) -> Result<&TemperatureGrid, Fault<B::Error>>
    where
        T: FnMut() -> u64,
    {
        let subpage = self
            .sensor
            .fetch_frame(&mut self.frame, now, self.data_timeout_us)
            .map_err(|err| {
                error!("Failed to get the frame data: {}", err.code());
                SensorProtocolError::FrameFetchFailed(err)
            })?;
        self.ambient_temperature = self
            .service
            .ambient_temperature(&self.frame, &self.parameters);
        self.service.compute_temperatures(
            &self.frame,
            &self.parameters,
            self.emissivity,
            self.ambient_temperature,
            &mut self.grid,
        );
        for kind in [DefectKind::Broken, DefectKind::Outlier] {
            let defects = self.service.defects(&self.parameters, kind);
            self.service.correct_defects(
                defects,
                &mut self.grid,
                DEFECT_CORRECTION_ITERATIONS,
                &self.parameters,
            );
        }
        debug!(
            "Subpage {:?} processed, ambient {}",
            subpage, self.ambient_temperature
        );
        Ok(&self.grid)
    }

    /// The temperatures from the most recent frame.
    pub fn grid(&self) -> &TemperatureGrid {
        &self.grid
    }

    /// The most recently fetched raw frame.
    pub fn frame(&self) -> &RawFrame {
        &self.frame
    }

    /// The sensor's own temperature during the most recent frame.
    pub fn ambient_temperature(&self) -> f32 {
        self.ambient_temperature
    }

    pub fn parameters(&self) -> &C::Parameters {
        &self.parameters
    }

    pub fn sensor_mut(&mut self) -> &mut Mlx90640<B> {
        &mut self.sensor
    }
}

impl<B, C> core::fmt::Debug for FramePipeline<B, C>
where
    B: HalfDuplexBus + core::fmt::Debug,
    C: CalibrationService + core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("sensor", &self.sensor)
            .field("service", &self.service)
            .field("emissivity", &self.emissivity)
            .field("ambient_temperature", &self.ambient_temperature)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;

    use crate::config::Config;
    use crate::error::*;
    use crate::register::{AccessPattern, SampleRate};
    use crate::sensor::Mlx90640;
    use crate::test::*;

    use super::FramePipeline;

    const ADDRESS: u8 = 0x33;

    fn sensor() -> (MockCameraBus, Mlx90640<MockCameraBus>) {
        let mock = mock_mlx90640_at_address(ADDRESS);
        (mock.clone(), Mlx90640::new(mock, ADDRESS))
    }

    fn bring_up_error(
        sensor: Mlx90640<MockCameraBus>,
        service: FakeCalibration,
        config: &Config,
    ) -> Fault<MockError> {
        match FramePipeline::bring_up(sensor, service, config) {
            Ok(_) => panic!("Bring-up should have failed"),
            Err(fault) => fault,
        }
    }

    #[test]
    fn bring_up_configures_sensor() {
        let (mock, sensor) = sensor();
        mock.poke(0x800D, &[0x0901]);
        let mut pipeline =
            FramePipeline::bring_up(sensor, FakeCalibration::new(), &Config::DEFAULT).unwrap();
        let control = pipeline.sensor_mut().control_register().unwrap();
        assert_eq!(control.sample_rate(), SampleRate::Sixteen);
        assert_eq!(control.access_pattern(), AccessPattern::Chess);
        assert_eq!(
            pipeline.parameters().eeprom_checksum,
            eeprom_checksum(&heatcam_test_data::eeprom_words())
        );
    }

    #[test]
    fn unsupported_rate() {
        let (mock, sensor) = sensor();
        mock.clear_recent_operations();
        let config = Config {
            sample_rate_hz: 15,
            ..Config::DEFAULT
        };
        let fault = bring_up_error(sensor, FakeCalibration::new(), &config);
        assert_eq!(
            fault,
            Fault::Configuration(ConfigurationError::UnsupportedSampleRate(15))
        );
        assert_eq!(fault.code(), 0);
        // Nothing touched the sensor.
        assert_eq!(mock.transaction_count(), 0);
    }

    #[test]
    fn sample_rate_failure() {
        let (mock, sensor) = sensor();
        mock.inject(InjectedFault::CorruptReadBack(0x0080));
        let fault = bring_up_error(sensor, FakeCalibration::new(), &Config::DEFAULT);
        assert_eq!(fault.description(), "Failed to set the camera refresh rate");
        assert_eq!(fault.code(), -4);
    }

    #[test]
    fn chess_mode_failure() {
        let (mock, sensor) = sensor();
        // Already at 16Hz but interleaved, so the only register write is for chess mode.
        mock.poke(0x800D, &[0x0A81]);
        mock.inject(InjectedFault::CorruptReadBack(0x1000));
        let fault = bring_up_error(sensor, FakeCalibration::new(), &Config::DEFAULT);
        assert_eq!(fault.description(), "Failed to set the camera to chess mode");
        assert_eq!(fault.code(), -4);
        assert!(matches!(
            fault,
            Fault::Sensor(SensorProtocolError::BringupFailed(
                BringupStep::SetChessMode,
                SensorError::Transport(TransportError::VerifyMismatch {
                    expected: 0x1A81,
                    actual: 0x0A81
                })
            ))
        ));
    }

    #[test]
    fn eeprom_dump_failure() {
        let (mock, sensor) = sensor();
        mock.inject(InjectedFault::ShortReadAt(0x2400, 12));
        let fault = bring_up_error(sensor, FakeCalibration::new(), &Config::DEFAULT);
        assert_eq!(fault.description(), "Failed to dump camera eeprom data");
        assert_eq!(fault.code(), -1);
    }

    #[test]
    fn extraction_failure() {
        let (_mock, sensor) = sensor();
        let mut service = FakeCalibration::new();
        service.set_extract_status(Some(-7));
        let fault = bring_up_error(sensor, service, &Config::DEFAULT);
        assert_eq!(fault.description(), "Problems when parsing camera eeprom data");
        assert_eq!(fault.code(), -7);
    }

    #[test]
    fn acquire_runs_calibration_steps() {
        let (_mock, sensor) = sensor();
        let service = FakeCalibration::new();
        let log = service.log();
        let config = Config {
            emissivity: 0.95,
            ..Config::DEFAULT
        };
        let mut pipeline = FramePipeline::bring_up(sensor, service, &config).unwrap();
        let grid = pipeline.acquire(|| 0).unwrap();
        assert_approx_eq!(
            f32,
            grid.values()[0],
            fake_temperature(heatcam_test_data::RAMP_BASE),
            ulps = 2
        );
        assert_eq!(pipeline.ambient_temperature(), FAKE_AMBIENT);
        let log = log.borrow();
        assert_eq!(log.emissivity, Some(0.95));
        assert_eq!(log.ambient_seen, Some(FAKE_AMBIENT));
        // Broken pixels first, then outliers, one iteration each.
        assert_eq!(log.corrections.len(), 2);
        assert_eq!(&log.corrections[0][..], &FAKE_BROKEN_PIXELS[..]);
        assert_eq!(&log.corrections[1][..], &FAKE_OUTLIER_PIXELS[..]);
        assert_eq!(&log.iterations[..], &[1, 1]);
    }

    #[test]
    fn acquire_failure() {
        let (mock, sensor) = sensor();
        let mut pipeline =
            FramePipeline::bring_up(sensor, FakeCalibration::new(), &Config::DEFAULT).unwrap();
        mock.inject(InjectedFault::ShortReadAt(0x0700, 4));
        let fault = pipeline.acquire(|| 0).unwrap_err();
        assert_eq!(fault.description(), "Failed to get the frame data");
        assert_eq!(fault.code(), -1);
        assert!(matches!(
            fault,
            Fault::Sensor(SensorProtocolError::FrameFetchFailed(SensorError::Transport(
                TransportError::ReadCountMismatch { .. }
            )))
        ));
    }

    #[test]
    fn acquire_gives_up_after_two_periods() {
        let (mock, sensor) = sensor();
        let mut pipeline =
            FramePipeline::bring_up(sensor, FakeCalibration::new(), &Config::DEFAULT).unwrap();
        mock.set_data_available(false);
        let mut ticks = 0u64;
        let fault = pipeline
            .acquire(|| {
                ticks += 1_000;
                ticks
            })
            .unwrap_err();
        assert_eq!(fault.code(), -9);
        assert!(matches!(
            fault,
            Fault::Sensor(SensorProtocolError::FrameFetchFailed(SensorError::DataNotReady))
        ));
        // Started at 1ms, gave up on the first reading 125ms later.
        assert_eq!(ticks, 126_000);
    }
}
