//! 分层批量归约
//!
//! 外部工具单次能接受的输入数量有限时，把 N 个有序单元按 batch_size
//! 分成连续批次逐批合并，再对合并结果重复同样的过程，直到只剩一个。
//! 每一层都保持输入的相对顺序。

use std::future::Future;
use std::ops::Range;

/// 一次合并调用在归约树中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStep {
    /// 树的层级，叶子层为 0
    pub level: usize,
    /// 本层内的批次序号
    pub batch_index: usize,
    /// 本层的批次总数
    pub batch_count: usize,
}

/// 归约错误
#[derive(Debug)]
pub enum ReduceError<E> {
    /// 没有任何输入
    Empty,
    /// batch_size 小于 2 时归约不会收敛
    InvalidBatchSize(usize),
    /// 某次合并失败，剩余的树被放弃
    Merge { step: MergeStep, source: E },
}

impl<E: std::fmt::Display> std::fmt::Display for ReduceError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceError::Empty => write!(f, "nothing to reduce"),
            ReduceError::InvalidBatchSize(size) => {
                write!(f, "batch size must be at least 2, got {}", size)
            }
            ReduceError::Merge { step, source } => write!(
                f,
                "merge failed at level {} batch {}/{}: {}",
                step.level,
                step.batch_index + 1,
                step.batch_count,
                source
            ),
        }
    }
}

impl<E> std::error::Error for ReduceError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReduceError::Merge { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// 把 `len` 个单元切成连续批次
pub fn plan_batches(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}

/// 归约 `len` 个单元需要的合并调用次数（单元素批次直接透传，不计入）
pub fn planned_merge_count(len: usize, batch_size: usize) -> usize {
    if batch_size < 2 {
        return 0;
    }

    let mut remaining = len;
    let mut merges = 0;
    while remaining > 1 {
        let batches = plan_batches(remaining, batch_size);
        merges += batches.iter().filter(|range| range.len() > 1).count();
        remaining = batches.len();
    }
    merges
}

/// 分层批量归约
///
/// - 0 个输入返回 `ReduceError::Empty`
/// - 1 个输入直接返回，不调用 merge
/// - 只含一个元素的批次原样进入下一层
/// - 任意一次 merge 失败立即返回，不再执行剩余合并
pub async fn reduce_in_batches<T, E, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    mut merge: F,
) -> Result<T, ReduceError<E>>
where
    F: FnMut(MergeStep, Vec<T>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if items.is_empty() {
        return Err(ReduceError::Empty);
    }
    if batch_size < 2 {
        return Err(ReduceError::InvalidBatchSize(batch_size));
    }

    let mut current = items;
    let mut level = 0;

    while current.len() > 1 {
        let ranges = plan_batches(current.len(), batch_size);
        let batch_count = ranges.len();
        let mut next = Vec::with_capacity(batch_count);
        let mut remaining = current.into_iter();

        for (batch_index, range) in ranges.into_iter().enumerate() {
            let batch: Vec<T> = remaining.by_ref().take(range.len()).collect();
            if batch.len() == 1 {
                next.extend(batch);
                continue;
            }

            let step = MergeStep {
                level,
                batch_index,
                batch_count,
            };
            let merged = merge(step, batch)
                .await
                .map_err(|source| ReduceError::Merge { step, source })?;
            next.push(merged);
        }

        current = next;
        level += 1;
    }

    current.pop().ok_or(ReduceError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn concat(batch: Vec<Vec<u32>>) -> Vec<u32> {
        batch.into_iter().flatten().collect()
    }

    #[test]
    fn test_plan_batches() {
        assert_eq!(plan_batches(23, 10), vec![0..10, 10..20, 20..23]);
        assert_eq!(plan_batches(10, 10), vec![0..10]);
        assert!(plan_batches(0, 10).is_empty());
    }

    #[test]
    fn test_planned_merge_count() {
        assert_eq!(planned_merge_count(23, 10), 4);
        assert_eq!(planned_merge_count(1, 10), 0);
        assert_eq!(planned_merge_count(10, 10), 1);
        // 21 = 10 + 10 + 1，单元素批次透传
        assert_eq!(planned_merge_count(21, 10), 3);
    }

    #[tokio::test]
    async fn test_reduce_preserves_order_across_levels() {
        let items: Vec<Vec<u32>> = (1..=23).map(|i| vec![i]).collect();
        let steps = Arc::new(Mutex::new(Vec::new()));

        let recorded = steps.clone();
        let result = reduce_in_batches(items, 10, |step, batch| {
            recorded.lock().unwrap().push((step, batch.len()));
            async move { Ok::<_, String>(concat(batch)) }
        })
        .await
        .unwrap();

        assert_eq!(result, (1..=23).collect::<Vec<_>>());

        let steps = steps.lock().unwrap();
        let sizes: Vec<(usize, usize)> = steps.iter().map(|(s, n)| (s.level, *n)).collect();
        assert_eq!(sizes, vec![(0, 10), (0, 10), (0, 3), (1, 3)]);
        assert_eq!(steps[2].0.batch_index, 2);
        assert_eq!(steps[2].0.batch_count, 3);
    }

    #[tokio::test]
    async fn test_single_item_is_returned_directly() {
        let result = reduce_in_batches(vec![vec![7u32]], 10, |_, _| async {
            Err::<Vec<u32>, _>("should not merge".to_string())
        })
        .await
        .unwrap();
        assert_eq!(result, vec![7]);
    }

    #[tokio::test]
    async fn test_empty_input_is_an_error() {
        let result = reduce_in_batches(Vec::<Vec<u32>>::new(), 10, |_, batch| async move {
            Ok::<_, String>(concat(batch))
        })
        .await;
        assert!(matches!(result, Err(ReduceError::Empty)));
    }

    #[tokio::test]
    async fn test_batch_size_below_two_is_rejected() {
        let result = reduce_in_batches(vec![vec![1u32], vec![2]], 1, |_, batch| async move {
            Ok::<_, String>(concat(batch))
        })
        .await;
        assert!(matches!(result, Err(ReduceError::InvalidBatchSize(1))));
    }

    #[tokio::test]
    async fn test_merge_failure_aborts_remaining_tree() {
        let items: Vec<Vec<u32>> = (0..30).map(|i| vec![i]).collect();
        let calls = Arc::new(Mutex::new(0usize));

        let counter = calls.clone();
        let result = reduce_in_batches(items, 10, |step, batch| {
            *counter.lock().unwrap() += 1;
            async move {
                if step.level == 0 && step.batch_index == 1 {
                    Err("muxer crashed".to_string())
                } else {
                    Ok(concat(batch))
                }
            }
        })
        .await;

        match result {
            Err(ReduceError::Merge { step, source }) => {
                assert_eq!(step.level, 0);
                assert_eq!(step.batch_index, 1);
                assert_eq!(source, "muxer crashed");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
