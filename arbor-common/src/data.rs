// Copyright 2019 The Druid Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Traits for handling value types.
use std::{collections::BTreeMap, rc::Rc, sync::Arc};

/// Value types that can be cheaply compared for "sameness".
///
/// This is the equality used to decide whether a component must re-render: two props values that
/// are `same` produce the same subtree. Shared pointers compare by address, everything else
/// by value.
pub trait Data: Clone + 'static {
    fn same(&self, other: &Self) -> bool;
}

/// An impl of `Data` suitable for simple types.
///
/// The `same` method is implemented with equality, so the type should
/// implement `Eq` at least.
macro_rules! impl_data_simple {
    ($($t:ty),*) => {
        $(
        impl Data for $t {
            fn same(&self, other: &Self) -> bool {
                self == other
            }
        }
        )*
    };
}

impl_data_simple!(i8, i16, i32, i64, i128, isize);
impl_data_simple!(u8, u16, u32, u64, u128, usize);
impl_data_simple!(char, bool, String, &'static str);
impl_data_simple!(std::time::Duration, std::path::PathBuf);

impl Data for f32 {
    fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl Data for f64 {
    fn same(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl<T: ?Sized + 'static> Data for Arc<T> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized + 'static> Data for Rc<T> {
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: Data> Data for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Data, U: Data> Data for Result<T, U> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Ok(a), Ok(b)) => a.same(b),
            (Err(a), Err(b)) => a.same(b),
            _ => false,
        }
    }
}

// Element-wise. Props are rebuilt every frame, so pointer identity of the buffer means nothing.
impl<T: Data> Data for Vec<T> {
    fn same(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a.same(b))
    }
}

impl<K: Ord + Clone + 'static, V: Data> Data for BTreeMap<K, V> {
    fn same(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va.same(vb))
    }
}

impl<T: Data, const N: usize> Data for [T; N] {
    fn same(&self, other: &Self) -> bool {
        self.iter().zip(other.iter()).all(|(a, b)| a.same(b))
    }
}

impl<T: 'static + ?Sized> Data for std::marker::PhantomData<T> {
    fn same(&self, _other: &Self) -> bool {
        // zero-sized types
        true
    }
}

impl Data for () {
    fn same(&self, _other: &Self) -> bool {
        true
    }
}

macro_rules! impl_data_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Data),+> Data for ($($name,)+) {
            fn same(&self, other: &Self) -> bool {
                $(self.$idx.same(&other.$idx))&&+
            }
        }
    };
}

impl_data_tuple!(T0: 0);
impl_data_tuple!(T0: 0, T1: 1);
impl_data_tuple!(T0: 0, T1: 1, T2: 2);
impl_data_tuple!(T0: 0, T1: 1, T2: 2, T3: 3);
impl_data_tuple!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4);
impl_data_tuple!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5);
