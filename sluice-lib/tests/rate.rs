use std::time::Duration;

use sluice_lib::rate_limit::{Burst, Rate};
use sluice_lib::SluiceError;

#[test]
fn unlimited_burst_keeps_events_and_period() -> Result<(), SluiceError> {
    let rate = Rate::new(10, Duration::from_millis(250), Burst::Unlimited)?;
    assert_eq!(rate.events(), 10);
    assert_eq!(rate.period(), Duration::from_millis(250));
    assert_eq!(rate.max_permits(), 10);
    Ok(())
}

#[test]
fn burst_at_or_above_events_is_untouched() -> Result<(), SluiceError> {
    let rate = Rate::new(10, Duration::from_secs(1), Burst::Limited(10))?;
    assert_eq!((rate.events(), rate.period()), (10, Duration::from_secs(1)));

    let rate = Rate::new(10, Duration::from_secs(1), Burst::Limited(40))?;
    assert_eq!((rate.events(), rate.period()), (10, Duration::from_secs(1)));
    assert_eq!(rate.max_permits(), 40);
    Ok(())
}

#[test]
fn small_burst_subdivides_the_period() -> Result<(), SluiceError> {
    let rate = Rate::new(50, Duration::from_secs(1), Burst::Limited(1))?;
    assert_eq!(rate.events(), 1);
    assert_eq!(rate.period(), Duration::from_millis(20));

    let rate = Rate::new(3, Duration::from_secs(1), Burst::Limited(1))?;
    assert_eq!(rate.period(), Duration::from_millis(333));

    let rate = Rate::new(1729, Duration::from_secs(1), Burst::Limited(2))?;
    assert_eq!(rate.events(), 2);
    assert_eq!(rate.period(), Duration::from_millis(1));
    Ok(())
}

#[test]
fn normalized_rate_never_exceeds_burst() -> Result<(), SluiceError> {
    for events in [1, 2, 7, 100, 999] {
        for burst in [1, 3, 10, 1000] {
            let rate = Rate::new(events, Duration::from_secs(10), Burst::Limited(burst))?;
            assert!(rate.events() <= burst);
            assert!(rate.period() <= Duration::from_secs(10));
            assert!(!rate.period().is_zero());
        }
    }
    Ok(())
}

#[test]
fn smoothing_below_one_millisecond_is_unsatisfiable() {
    let result = Rate::new(1000, Duration::from_millis(1), Burst::Limited(1));
    assert!(matches!(
        result,
        Err(SluiceError::UnsatisfiableRate { events: 1000, burst: 1, period }) if period == Duration::from_millis(1)
    ));
}

#[test]
fn invalid_arguments_are_rejected() {
    assert!(matches!(
        Rate::new(0, Duration::from_secs(1), Burst::Unlimited),
        Err(SluiceError::InvalidArgument(_))
    ));
    assert!(matches!(
        Rate::new(1, Duration::ZERO, Burst::Unlimited),
        Err(SluiceError::InvalidArgument(_))
    ));
    assert!(matches!(
        Rate::new(1, Duration::from_micros(999), Burst::Unlimited),
        Err(SluiceError::InvalidArgument(_))
    ));
    assert!(matches!(
        Rate::new(1, Duration::from_secs(1), Burst::Limited(0)),
        Err(SluiceError::InvalidArgument(_))
    ));
}

#[test]
fn per_second_and_display() -> Result<(), SluiceError> {
    let rate = Rate::per_second(5)?;
    assert_eq!(rate, Rate::new(5, Duration::from_millis(1000), Burst::Unlimited)?);
    assert_eq!(rate.to_string(), "5 per 1s (burst unlimited)");
    assert_eq!(Burst::from(Some(3)), Burst::Limited(3));
    assert_eq!(Burst::from(None), Burst::Unlimited);
    Ok(())
}
