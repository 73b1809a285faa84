//! Safe-ish conversions between rust and sql types.

use super::*;

pub fn i64_to_u64(i: i64) -> JudgingResult<u64> {
    u64::try_from(i)
        .map_err(|_| JudgingError::storage("i64 value is negative and cannot be converted to u64"))
}

pub fn i32_to_u32(i: i32) -> JudgingResult<u32> {
    u32::try_from(i)
        .map_err(|_| JudgingError::storage("i32 value is negative and cannot be converted to u32"))
}
pub fn u32_to_i32(i: u32) -> JudgingResult<i32> {
    i32::try_from(i).map_err(|_| {
        JudgingError::storage("u32 value exceeds i32::MAX and cannot be converted to i32")
    })
}

pub fn deserialize_evaluations(i: Value) -> JudgingResult<Vec<EvaluationRecord>> {
    serde_json::from_value(i).map_err(JudgingError::storage)
}
pub fn serialize_evaluations(i: &[EvaluationRecord]) -> JudgingResult<Value> {
    serde_json::to_value(i).map_err(JudgingError::storage)
}

pub fn deserialize_judged_by(i: Value) -> JudgingResult<Vec<String>> {
    serde_json::from_value(i).map_err(JudgingError::storage)
}
pub fn serialize_judged_by(i: &[String]) -> JudgingResult<Value> {
    serde_json::to_value(i).map_err(JudgingError::storage)
}
