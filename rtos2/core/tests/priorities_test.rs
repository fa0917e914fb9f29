//! Priority tests for rtos2-core

use rtos2_core::{priority, OsError, Priority};

#[test]
fn test_priority_creation() {
    let prio = Priority::new(24);
    assert_eq!(prio, Ok(Priority::NORMAL));
}

#[test]
fn test_priority_invalid_none() {
    assert_eq!(Priority::new(0), Err(OsError::Parameter));
    assert!(!Priority::NONE.is_valid());
    assert!(!Priority::ERROR.is_valid());
}

#[test]
fn test_priority_bands() {
    assert_eq!(Priority::LOW.plus(7).raw(), 15);
    assert_eq!(Priority::BELOW_NORMAL.raw(), 16);
    assert_eq!(Priority::REALTIME.plus(7).raw(), 55);
    assert!(Priority::ISR.is_valid());
    assert!(!Priority::ISR.plus(1).is_valid());
}

#[test]
fn test_priority_ordering() {
    assert!(Priority::HIGH > Priority::NORMAL);
    assert!(Priority::IDLE < Priority::LOW);
}

#[test]
fn test_priority_macro() {
    const P: Priority = priority!(40);
    assert_eq!(P, Priority::HIGH);
    assert_eq!(P.to_native(), 40);
}

#[test]
fn test_default_priority_is_normal() {
    assert_eq!(Priority::default(), Priority::NORMAL);
}
