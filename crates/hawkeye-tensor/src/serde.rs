use crate::{get_strides_from_shape, Tensor};

use ::serde::ser::SerializeStruct;
use ::serde::Deserialize;

impl<T, const N: usize> ::serde::Serialize for Tensor<T, N>
where
    T: ::serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ::serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Tensor", 3)?;
        state.serialize_field("data", self.as_slice())?;
        state.serialize_field("shape", &self.shape.to_vec())?;
        state.serialize_field("strides", &self.strides.to_vec())?;
        state.end()
    }
}

impl<'de, T, const N: usize> ::serde::Deserialize<'de> for Tensor<T, N>
where
    T: ::serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: ::serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TensorData<T> {
            data: Vec<T>,
            shape: Vec<usize>,
        }

        let TensorData { data, shape } = TensorData::deserialize(deserializer)?;

        let shape: [usize; N] = shape
            .try_into()
            .map_err(|_| ::serde::de::Error::custom("Invalid shape"))?;

        if shape.iter().product::<usize>() != data.len() {
            return Err(::serde::de::Error::custom(
                "Tensor data length does not match its shape",
            ));
        }

        // strides are always recomputed, tensors are stored contiguous
        Ok(Tensor {
            storage: data,
            shape,
            strides: get_strides_from_shape(shape),
        })
    }
}
