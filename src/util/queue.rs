// Copyright (c) 2019 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// A blocking FIFO queue feeding a pool of worker threads.
///
/// `pop` parks the calling thread until an item becomes available. There is
/// no close operation; shutdown is expressed in the item type, typically by
/// pushing one sentinel value per worker.
pub struct WorkQueue<T> {
    cvar: Condvar,
    items: Mutex<VecDeque<T>>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> WorkQueue<T> {
        WorkQueue {
            cvar: Condvar::new(),
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Adds an item to the back of the queue.
    pub fn push(&self, item: T) {
        self.items.lock().unwrap().push_back(item);
        self.cvar.notify_one();
    }

    /// Adds many items while holding the queue lock once. Returns the number
    /// of items pushed.
    pub fn push_many<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut queue = self.items.lock().unwrap();
        let mut count = 0;

        for item in items {
            queue.push_back(item);
            count += 1;
        }

        self.cvar.notify_all();

        count
    }

    /// Removes the item at the front of the queue, waiting for one to become
    /// available if the queue is empty.
    pub fn pop(&self) -> T {
        let mut queue = self.items.lock().unwrap();

        loop {
            if let Some(item) = queue.pop_front() {
                return item;
            }

            queue = self.cvar.wait(queue).unwrap();
        }
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> WorkQueue<T> {
        WorkQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order() {
        let queue = WorkQueue::new();
        assert_eq!(queue.push_many(vec![1, 2, 3]), 3);
        queue.push(4);

        assert_eq!(queue.pop(), 1);
        assert_eq!(queue.pop(), 2);
        assert_eq!(queue.pop(), 3);
        assert_eq!(queue.pop(), 4);
    }

    #[test]
    fn pop_blocks_until_push() {
        let queue = Arc::new(WorkQueue::new());

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };

        queue.push(42);

        assert_eq!(consumer.join().unwrap(), 42);
    }
}
