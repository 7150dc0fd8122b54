// ==========================================
// 课表审计引擎 - 时段重叠判定
// ==========================================
// 职责: 判定两个 (星期, 开始, 结束) 时段是否相交
// 红线: 半开区间,首尾相接不算重叠 (09:00-10:00 与 10:00-11:00 可连排)
// 红线: 无状态、无副作用、无错误分支
// ==========================================
// 注: 缺失星期/时间的时段由调用方预先排除
// ==========================================

use crate::domain::routine::SlotWindow;
use crate::domain::types::Weekday;
use chrono::NaiveTime;

// ==========================================
// OverlapEvaluator - 纯函数工具类
// ==========================================
pub struct OverlapEvaluator;

impl OverlapEvaluator {
    /// 判定两个时段是否重叠
    ///
    /// # 规则
    /// day1 == day2 且 start1 < end2 且 start2 < end1
    pub fn overlaps(
        day1: Weekday,
        start1: NaiveTime,
        end1: NaiveTime,
        day2: Weekday,
        start2: NaiveTime,
        end2: NaiveTime,
    ) -> bool {
        day1 == day2 && start1 < end2 && start2 < end1
    }

    /// 判定两个时段窗口是否重叠
    pub fn windows_overlap(a: &SlotWindow, b: &SlotWindow) -> bool {
        Self::overlaps(
            a.day,
            a.range.start,
            a.range.end,
            b.day,
            b.range.start,
            b.range.end,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TimeRange;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn w(day: Weekday, start: NaiveTime, end: NaiveTime) -> SlotWindow {
        SlotWindow {
            day,
            range: TimeRange::new(start, end),
        }
    }

    #[test]
    fn test_identical_ranges_overlap() {
        let a = w(Weekday::Monday, t(9, 0), t(10, 0));
        assert!(OverlapEvaluator::windows_overlap(&a, &a));
    }

    #[test]
    fn test_touching_boundary_does_not_overlap() {
        let a = w(Weekday::Monday, t(9, 0), t(10, 0));
        let b = w(Weekday::Monday, t(10, 0), t(11, 0));
        assert!(!OverlapEvaluator::windows_overlap(&a, &b));
        assert!(!OverlapEvaluator::windows_overlap(&b, &a));
    }

    #[test]
    fn test_different_day_never_overlaps() {
        let a = w(Weekday::Monday, t(9, 0), t(10, 0));
        let b = w(Weekday::Tuesday, t(9, 0), t(10, 0));
        assert!(!OverlapEvaluator::windows_overlap(&a, &b));
    }

    #[test]
    fn test_containment_overlaps() {
        let outer = w(Weekday::Friday, t(8, 0), t(12, 0));
        let inner = w(Weekday::Friday, t(9, 30), t(10, 15));
        assert!(OverlapEvaluator::windows_overlap(&outer, &inner));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let starts = [t(8, 0), t(9, 0), t(9, 30), t(10, 0), t(11, 0)];
        for &s1 in &starts {
            for &s2 in &starts {
                let a = w(Weekday::Wednesday, s1, s1 + chrono::Duration::minutes(60));
                let b = w(Weekday::Wednesday, s2, s2 + chrono::Duration::minutes(45));
                assert_eq!(
                    OverlapEvaluator::windows_overlap(&a, &b),
                    OverlapEvaluator::windows_overlap(&b, &a)
                );
            }
        }
    }
}
