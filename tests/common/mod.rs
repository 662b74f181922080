#![allow(dead_code)]

use ndarray::Array4;
use shelfscan::Engine;
use shelfscan::error::{PipelineError, Result};

/// 返回固定输出的推理引擎，记录收到的输入
pub struct FakeEngine {
    pub shape: [usize; 4],
    pub output: Vec<f32>,
    pub fail: bool,
    pub runs: usize,
    pub last_input: Vec<f32>,
}

impl FakeEngine {
    pub fn new(width: usize, height: usize, output: Vec<f32>) -> Self {
        Self {
            shape: [1, 3, height, width],
            output,
            fail: false,
            runs: 0,
            last_input: Vec::new(),
        }
    }

    pub fn failing(width: usize, height: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(width, height, Vec::new())
        }
    }
}

impl Engine for FakeEngine {
    fn input_shape(&self) -> [usize; 4] {
        self.shape
    }

    fn run(&mut self, input: &Array4<f32>) -> Result<Vec<f32>> {
        self.runs += 1;
        if self.fail {
            return Err(PipelineError::InferenceFailure("引擎故障".to_string()));
        }
        self.last_input = input.iter().copied().collect();
        Ok(self.output.clone())
    }
}

/// 一条预测记录: 中心、宽高、objectness 和类别分数
pub fn record(cx: f32, cy: f32, w: f32, h: f32, obj: f32, scores: &[f32]) -> Vec<f32> {
    let mut r = vec![cx, cy, w, h, obj];
    r.extend_from_slice(scores);
    r
}

pub fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
