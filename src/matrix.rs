///A dense matrix stored by rows.
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Matrix<T>
{
	data: Vec<T>,
	num_rows: usize,
	num_columns: usize,
}

impl<T:Clone> Matrix<T>
{
	///A matrix with every cell equal to `value`. A failed reservation is reported instead of aborting.
	pub fn try_constant(value:T, num_rows:usize, num_columns:usize) -> Result<Matrix<T>,std::collections::TryReserveError>
	{
		let size = num_rows*num_columns;
		let mut data = Vec::new();
		data.try_reserve_exact(size)?;
		data.resize(size,value);
		Ok(Matrix{
			data,
			num_rows,
			num_columns,
		})
	}
}

impl<T> Matrix<T>
{
	pub fn get(&self, row:usize, column:usize) -> &T
	{
		&self.data[row*self.num_columns+column]
	}
	pub fn get_mut(&mut self, row:usize, column:usize) -> &mut T
	{
		&mut self.data[row*self.num_columns+column]
	}
	pub fn get_rows(&self) -> usize
	{
		self.num_rows
	}
	pub fn get_columns(&self) -> usize
	{
		self.num_columns
	}
	pub fn row(&self, row:usize) -> &[T]
	{
		&self.data[row*self.num_columns..(row+1)*self.num_columns]
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn cells_by_rows()
	{
		let mut matrix = Matrix::try_constant(0u8,3,2).unwrap();
		assert_eq!((matrix.get_rows(),matrix.get_columns()),(3,2));
		*matrix.get_mut(1,1) = 7;
		assert_eq!(*matrix.get(1,1),7);
		assert_eq!(matrix.row(1),&[0,7]);
		assert_eq!(matrix.row(2),&[0,0]);
	}
}
