//! 时间轴构建
//!
//! 把按 index 排好序的合成结果折叠成带绝对起始时间的播放单元，
//! 并在最后追加固定时长的结尾片段。

use super::narration::{SynthesisResult, TimedUnit, UnitKind};

/// 默认结尾片段时长（秒）
pub const DEFAULT_CLOSING_DURATION_SECS: f64 = 5.0;

/// 构建时间轴
///
/// `results` 必须已按 index 升序排列（SynthesisScheduler 保证）。
/// 第 i 个旁白单元的 start_offset 等于前 i 个时长之和；
/// 结尾单元的 start_offset 等于全部旁白时长之和，segment_index 紧接最后一个旁白单元。
pub fn build_timeline(results: &[SynthesisResult], closing_duration: f64) -> Vec<TimedUnit> {
    let mut units = Vec::with_capacity(results.len() + 1);

    let total = results.iter().fold(0.0_f64, |cumulative, result| {
        units.push(TimedUnit {
            segment_index: result.index,
            start_offset: cumulative,
            duration: result.duration,
            kind: UnitKind::Narration,
        });
        cumulative + result.duration
    });

    units.push(TimedUnit {
        segment_index: results.last().map_or(0, |r| r.index + 1),
        start_offset: total,
        duration: closing_duration,
        kind: UnitKind::Closing,
    });

    units
}

/// 时间轴总时长（秒）
pub fn total_duration(units: &[TimedUnit]) -> f64 {
    units.last().map_or(0.0, TimedUnit::end_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::narration::{ArtifactHandle, ArtifactId, ArtifactStage};
    use std::path::PathBuf;

    fn result(index: usize, duration: f64) -> SynthesisResult {
        SynthesisResult {
            index,
            audio: ArtifactHandle::new(
                ArtifactId::new(index as u64),
                PathBuf::from(format!("audio_{}.mp3", index)),
                ArtifactStage::Audio,
            ),
            duration,
        }
    }

    #[test]
    fn test_offsets_are_prefix_sums() {
        let durations = [1.25, 3.5, 0.75, 2.0];
        let results: Vec<_> = durations
            .iter()
            .enumerate()
            .map(|(i, d)| result(i, *d))
            .collect();

        let units = build_timeline(&results, DEFAULT_CLOSING_DURATION_SECS);
        assert_eq!(units.len(), durations.len() + 1);

        let mut expected = 0.0;
        for (i, unit) in units.iter().take(durations.len()).enumerate() {
            assert_eq!(unit.kind, UnitKind::Narration);
            assert_eq!(unit.segment_index, i);
            assert_eq!(unit.start_offset, expected);
            expected += durations[i];
        }
    }

    #[test]
    fn test_offsets_are_non_decreasing() {
        let results: Vec<_> = (0..20).map(|i| result(i, (i % 3) as f64 * 0.4)).collect();
        let units = build_timeline(&results, 5.0);
        assert!(units
            .windows(2)
            .all(|pair| pair[0].start_offset <= pair[1].start_offset));
    }

    #[test]
    fn test_closing_unit_follows_narration() {
        let results = vec![result(0, 2.0), result(1, 3.0)];
        let units = build_timeline(&results, 5.0);

        let closing = units.last().unwrap();
        assert!(closing.is_closing());
        assert_eq!(closing.start_offset, 5.0);
        assert_eq!(closing.duration, 5.0);
        assert_eq!(total_duration(&units), 10.0);
    }

    #[test]
    fn test_empty_results_only_closing() {
        let units = build_timeline(&[], 5.0);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].start_offset, 0.0);
        assert!(units[0].is_closing());
    }

    #[test]
    fn test_timeline_over_kept_units_with_gap() {
        // 片段 1 被跳过
        let results = vec![result(0, 1.5), result(2, 2.5)];
        let units = build_timeline(&results, 5.0);

        assert_eq!(units[1].segment_index, 2);
        assert_eq!(units[1].start_offset, 1.5);
        assert_eq!(units[2].segment_index, 3);
        assert_eq!(units[2].start_offset, 4.0);
    }
}
