mod common;

use std::time::Duration;

use common::{init_logging, SerialIOPlane, SerialInterface, SimDevice};
use hlg1_proto::workflow::{self, BufferSetup};
use hlg1_proto::{BufferingStatus, Error, ErrorCode, Hlg1, TransportConfig};

fn connect(serial: &std::rc::Rc<std::cell::RefCell<SerialInterface>>) -> Hlg1<SerialIOPlane> {
    let config = TransportConfig {
        frame_timeout: Duration::from_millis(100),
    };
    Hlg1::with_config(SerialIOPlane::new(serial), 1, config).unwrap()
}

#[test]
fn zero_then_arm_trigger_and_read_out() {
    init_logging();
    let serial = SerialInterface::with_device(1, SimDevice::new(1_234_567));
    let mut dev = connect(&serial);

    assert_eq!(workflow::zero_offset(&mut dev).unwrap(), -1_234_567);
    assert_eq!(dev.get_measurement().unwrap(), 0);

    let setup = BufferSetup {
        amount: 6,
        ..BufferSetup::default()
    };
    assert_eq!(
        workflow::arm_buffer(&mut dev, &setup).unwrap(),
        BufferingStatus::WaitForTrigger
    );
    assert_eq!(dev.get_trigger_point().unwrap(), 300);
    assert!(!dev.get_timing_input().unwrap());

    assert_eq!(workflow::trigger(&mut dev).unwrap(), (false, true));

    let mut out = Vec::new();
    let samples = workflow::readout(&mut dev, &mut out).unwrap();
    assert_eq!(samples, vec![-3, -2, -1, 0, 1, 2]);
    assert_eq!(String::from_utf8(out).unwrap(), "-3\n-2\n-1\n0\n1\n2\n");
    assert!(!dev.get_timing_input().unwrap());
}

#[test]
fn arm_frames() {
    let serial = SerialInterface::with_device(1, SimDevice::new(0));
    let mut dev = connect(&serial);
    workflow::arm_buffer(&mut dev, &BufferSetup::default()).unwrap();

    let expected: Vec<&[u8]> = vec![
        b"%01#WBS+00000**\r",
        b"%01#WBR+00001**\r",
        b"%01#WBD+00001**\r",
        b"%01#WZS+00001**\r",
        b"%01#WZS+00000**\r",
        b"%01#WBC+03000**\r",
        b"%01#WTP+00300**\r",
        b"%01#WTL+00000**\r",
        b"%01#WTR+00000**\r",
        b"%01#WBS+00001**\r",
        b"%01#RTS**\r",
        b"%01#WTI+00000**\r",
    ];
    assert_eq!(serial.borrow().frames, expected);
}

#[test]
fn readout_requires_completed_buffer() {
    let serial = SerialInterface::with_device(1, SimDevice::new(0));
    let mut dev = connect(&serial);
    workflow::arm_buffer(&mut dev, &BufferSetup::default()).unwrap();

    let mut out = Vec::new();
    let err = workflow::readout(&mut dev, &mut out).unwrap_err();
    assert!(matches!(
        err,
        Error::BufferNotReady {
            status: BufferingStatus::WaitForTrigger
        }
    ));
    assert!(out.is_empty());
}

#[test]
fn arm_stops_at_first_error() {
    let serial = SerialInterface::with_device(1, SimDevice::new(0));
    let mut dev = connect(&serial);

    serial.borrow_mut().device(1).fail_next = Some(*b"21");
    let err = workflow::arm_buffer(&mut dev, &BufferSetup::default()).unwrap_err();
    assert_eq!(err.device_error_code(), Some(ErrorCode::ControlFlow));
    assert_eq!(serial.borrow().frames.len(), 1);
}

#[test]
fn arm_rejects_oversized_setup_before_sending_it() {
    let serial = SerialInterface::with_device(1, SimDevice::new(0));
    let mut dev = connect(&serial);
    let setup = BufferSetup {
        amount: 100_000,
        ..BufferSetup::default()
    };
    let err = workflow::arm_buffer(&mut dev, &setup).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
    // stop, rate, mode and the zero set pulse went out, the amount did not
    assert_eq!(serial.borrow().frames.len(), 5);
}

#[test]
fn readout_to_file_keeps_previous_data_until_ready() {
    let path = std::env::temp_dir().join(format!("hlg1-readout-{}.txt", std::process::id()));
    std::fs::write(&path, "1\n2\n").unwrap();

    let serial = SerialInterface::with_device(1, SimDevice::new(0));
    let mut dev = connect(&serial);
    let setup = BufferSetup {
        amount: 2,
        ..BufferSetup::default()
    };
    workflow::arm_buffer(&mut dev, &setup).unwrap();

    let err = workflow::readout_to_file(&mut dev, &path).unwrap_err();
    assert!(matches!(err, Error::BufferNotReady { .. }));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\n2\n");

    workflow::trigger(&mut dev).unwrap();
    assert_eq!(workflow::readout_to_file(&mut dev, &path).unwrap(), vec![-1, 0]);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "-1\n0\n");
    std::fs::remove_file(&path).unwrap();
}
