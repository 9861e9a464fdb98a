use crate::{get_strides_from_shape, Tensor};

impl<T, const N: usize> ::bincode::enc::Encode for Tensor<T, N>
where
    T: ::bincode::enc::Encode,
{
    fn encode<E: ::bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), ::bincode::error::EncodeError> {
        ::bincode::Encode::encode(&self.shape, encoder)?;
        ::bincode::Encode::encode(&self.storage, encoder)?;
        Ok(())
    }
}

impl<T, const N: usize, C> ::bincode::de::Decode<C> for Tensor<T, N>
where
    T: ::bincode::de::Decode<C>,
{
    fn decode<D: ::bincode::de::Decoder<Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, ::bincode::error::DecodeError> {
        let shape: [usize; N] = ::bincode::Decode::decode(decoder)?;
        let storage: Vec<T> = ::bincode::Decode::decode(decoder)?;
        let numel = shape.iter().product::<usize>();
        if numel != storage.len() {
            return Err(::bincode::error::DecodeError::OtherString(format!(
                "Tensor shape {:?} expects {} elements, got {}",
                shape,
                numel,
                storage.len()
            )));
        }
        Ok(Self {
            storage,
            shape,
            strides: get_strides_from_shape(shape),
        })
    }
}

impl<'de, T, const N: usize, C> ::bincode::de::BorrowDecode<'de, C> for Tensor<T, N>
where
    T: ::bincode::de::BorrowDecode<'de, C>,
{
    fn borrow_decode<D: ::bincode::de::BorrowDecoder<'de, Context = C>>(
        decoder: &mut D,
    ) -> Result<Self, ::bincode::error::DecodeError> {
        let shape: [usize; N] = ::bincode::BorrowDecode::borrow_decode(decoder)?;
        let storage: Vec<T> = ::bincode::BorrowDecode::borrow_decode(decoder)?;
        let numel = shape.iter().product::<usize>();
        if numel != storage.len() {
            return Err(::bincode::error::DecodeError::OtherString(format!(
                "Tensor shape {:?} expects {} elements, got {}",
                shape,
                numel,
                storage.len()
            )));
        }
        Ok(Self {
            storage,
            shape,
            strides: get_strides_from_shape(shape),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Tensor2;

    #[test]
    fn test_bincode() -> Result<(), Box<dyn std::error::Error>> {
        let tensor = Tensor2::<f32>::from_shape_vec([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&tensor, config)?;
        let (decoded, read): (Tensor2<f32>, usize) = bincode::decode_from_slice(&bytes, config)?;
        assert_eq!(read, bytes.len());
        assert_eq!(tensor, decoded);
        Ok(())
    }
}
