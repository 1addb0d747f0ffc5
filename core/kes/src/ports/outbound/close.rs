//! close 可能な入力 Outbound ポート
//!
//! 入力が close 手段を持つかどうかは `EventStream` の生成時に決まる。
//! close を持たない入力では `EventStream::close` は「閉じた」印を付けるだけになる。

use std::io;

/// 明示的に解放できる入力（HTTP レスポンスボディ等）
pub trait Close {
    /// 下層のリソースを解放する。`EventStream` からは高々 1 回しか呼ばれない。
    fn close(&mut self) -> io::Result<()>;
}

impl<C: Close + ?Sized> Close for Box<C> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<C: Close + ?Sized> Close for &mut C {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
