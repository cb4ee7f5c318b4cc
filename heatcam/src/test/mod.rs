mod sink;

pub(crate) use bus::{
    mock_mlx90640_at_address, BusOperation, InjectedFault, MockCameraBus, MockError,
};
pub(crate) use calibration::{
    eeprom_checksum, fake_temperature, FakeCalibration, FAKE_AMBIENT, FAKE_BROKEN_PIXELS,
    FAKE_OUTLIER_PIXELS,
};
pub(crate) use platform::ScriptedPlatform;
pub(crate) use sink::{RecordingSink, SinkOperation};
