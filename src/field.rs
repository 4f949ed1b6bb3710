/*---------------------------------------------------------------------------------------------
 *  Copyright (c) Microsoft Corporation. All rights reserved.
 *  Licensed under the Apache License, Version 2.0. See LICENSE.txt in the project root for license information.
 *  This software incorporates material from third parties. See NOTICE.txt for details.
 *--------------------------------------------------------------------------------------------*/

//! `Field`: one variable's contiguous binary32 buffer plus the metadata
//! the variable dispatcher and slice driver need (§3).

use crate::bitround_error::{err_exit_code, BitroundError, ExitCode, Result};

/// One array variable delivered by the external reader (§6). Owns its
/// buffer exclusively for the duration of analysis+round; the reader
/// hands it in, the writer takes it back out.
pub struct Field {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
    pub fill_value: Option<f32>,
    pub is_coordinate: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return err_exit_code(
                ExitCode::MalformedBuffer,
                &format!(
                    "buffer length {} does not match declared shape {:?} (expected {})",
                    data.len(),
                    shape,
                    expected
                ),
            );
        }

        Ok(Field {
            name: name.into(),
            shape,
            data,
            fill_value: None,
            is_coordinate: false,
        })
    }

    pub fn with_fill_value(mut self, fill_value: f32) -> Self {
        self.fill_value = Some(fill_value);
        self
    }

    pub fn as_coordinate(mut self) -> Self {
        self.is_coordinate = true;
        self
    }

    /// length of the trailing 2-D pane; equals the whole buffer when rank <= 2.
    pub fn trailing_extent(&self) -> usize {
        match self.shape.len() {
            0 => 0,
            1 => self.shape[0],
            k => self.shape[k - 2] * self.shape[k - 1],
        }
    }

    /// number of leading-dimension combinations (1 when rank <= 2).
    pub fn num_slices(&self) -> Result<usize> {
        let extent = self.trailing_extent();
        if extent == 0 {
            return Ok(if self.data.is_empty() { 0 } else { 1 });
        }
        if self.data.len() % extent != 0 {
            return err_exit_code(
                ExitCode::MalformedBuffer,
                &format!(
                    "buffer length {} is not a multiple of the trailing 2-D extent {}",
                    self.data.len(),
                    extent
                ),
            );
        }
        Ok(self.data.len() / extent)
    }

    pub fn contains_nan(&self) -> bool {
        self.data.iter().any(|x| x.is_nan())
    }

    pub fn contains_fill_value(&self) -> bool {
        match self.fill_value {
            Some(f) => {
                let fb = f.to_bits();
                self.data.iter().any(|x| x.to_bits() == fb)
            }
            None => false,
        }
    }
}

/// mutable view over one slice's contiguous run of elements within a Field's buffer.
pub struct SliceMut<'a> {
    pub data: &'a mut [f32],
}

/// splits `field.data` into disjoint trailing-2-D-pane slices, per §4.6.
pub fn slices_mut(field: &mut Field) -> Result<Vec<SliceMut<'_>>> {
    let extent = field.trailing_extent();
    let count = field.num_slices()?;

    if count == 0 {
        return Ok(Vec::new());
    }

    if extent == 0 {
        return err_exit_code(
            ExitCode::MalformedBuffer,
            "cannot slice a Field with an empty shape",
        );
    }

    Ok(field
        .data
        .chunks_mut(extent)
        .map(|data| SliceMut { data })
        .collect())
}

impl From<BitroundError> for anyhow::Error {
    fn from(e: BitroundError) -> Self {
        anyhow::anyhow!(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rank_le_2_is_a_single_slice() {
        let f = Field::new("v", vec![4], vec![0.0; 4]).unwrap();
        assert_eq!(f.num_slices().unwrap(), 1);
        assert_eq!(f.trailing_extent(), 4);

        let f2 = Field::new("v2", vec![2, 3], vec![0.0; 6]).unwrap();
        assert_eq!(f2.num_slices().unwrap(), 1);
        assert_eq!(f2.trailing_extent(), 6);
    }

    #[test]
    fn rank_3_partitions_into_leading_dim_slices() {
        let f = Field::new("v", vec![2, 4, 8], vec![0.0; 64]).unwrap();
        assert_eq!(f.trailing_extent(), 32);
        assert_eq!(f.num_slices().unwrap(), 2);
    }

    #[test]
    fn mismatched_shape_is_fatal() {
        let err = Field::new("v", vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert_eq!(err.code, ExitCode::MalformedBuffer);
    }

    #[test]
    fn slices_mut_partitions_disjointly() {
        let mut f = Field::new("v", vec![2, 2, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        let slices = slices_mut(&mut f).unwrap();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].data, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(slices[1].data, [5.0, 6.0, 7.0, 8.0]);
    }
}
