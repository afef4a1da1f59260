use crate::error::Result;
use crate::model::{SensorRange, SensorReadings};
use rand::Rng;
use std::collections::BTreeMap;

/// 随机读数生成器
///
/// 每个被跟踪的传感器都有一个闭区间，生成的值永远落在区间内。
#[derive(Debug, Clone, Default)]
pub struct SensorGenerator {
    ranges: BTreeMap<String, SensorRange>,
}

impl SensorGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 (名称, min, max) 列表构建，任何非法区间都会导致失败
    pub fn from_bounds<I, S>(bounds: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64, f64)>,
        S: Into<String>,
    {
        let mut generator = Self::new();
        for (name, min, max) in bounds {
            let name = name.into();
            let range = SensorRange::new(&name, min, max)?;
            generator.ranges.insert(name, range);
        }
        Ok(generator)
    }

    /// 添加（或替换）一个传感器的区间
    pub fn with_range(mut self, name: impl Into<String>, range: SensorRange) -> Self {
        self.ranges.insert(name.into(), range);
        self
    }

    pub fn range(&self, name: &str) -> Option<&SensorRange> {
        self.ranges.get(name)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &str> {
        self.ranges.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// 为每个传感器生成一个随机值
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> SensorReadings {
        self.ranges
            .iter()
            .map(|(name, range)| (name.clone(), Self::sample(range, rng)))
            .collect()
    }

    fn sample<R: Rng + ?Sized>(range: &SensorRange, rng: &mut R) -> f64 {
        if range.min() == range.max() {
            return range.min();
        }
        // 宽度已保证有限；按比例插值，浮点舍入不能越过边界
        let span = range.max() - range.min();
        (range.min() + rng.gen::<f64>() * span).clamp(range.min(), range.max())
    }
}
